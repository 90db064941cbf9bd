//! Viewport-relative layout and stacking order.
//!
//! - `viewport_center` — where pasted/captured cards land.
//! - `gather` — pack every card into the visible rectangle.
//! - `focus` — center the selection's bounding box in the visible rectangle.
//! - z-order helpers — front/back/forward/backward for the selection.

use crate::geometry::{Bounds, Point};
use crate::model::CanvasItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The visible part of the scrollable canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub scroll_x: f32,
    #[serde(default)]
    pub scroll_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn scrolled(mut self, scroll_x: f32, scroll_y: f32) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    /// The visible rectangle in canvas coordinates.
    pub fn rect(&self) -> Bounds {
        Bounds {
            x: self.scroll_x,
            y: self.scroll_y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }
}

/// Center of the visible area, or `fallback` when the canvas could not be
/// located (no viewport measured yet).
pub fn viewport_center(viewport: Option<&Viewport>, fallback: Point) -> Point {
    viewport.map(Viewport::center).unwrap_or(fallback)
}

/// Spacing used by [`gather`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatherSpacing {
    /// Inset from the viewport edges.
    pub padding: f32,
    /// Gap between grid cells.
    pub gap: f32,
}

impl Default for GatherSpacing {
    fn default() -> Self {
        Self {
            padding: 40.0,
            gap: 24.0,
        }
    }
}

/// Move every card into the viewport, packed on a grid in stacking order.
///
/// Cells are sized to the largest card. When the grid would spill over, the
/// cell pitch shrinks so the last row/column still ends inside the viewport
/// (cards overlap instead of leaving it). A card larger than the viewport
/// itself is pinned to the top-left of the padded area.
pub fn gather(items: &[CanvasItem], viewport: &Viewport, spacing: GatherSpacing) -> Vec<CanvasItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let area = viewport.rect();
    let pad = if spacing.padding * 2.0 < area.width.min(area.height) {
        spacing.padding
    } else {
        0.0
    };
    let inner = Bounds {
        x: area.x + pad,
        y: area.y + pad,
        width: area.width - pad * 2.0,
        height: area.height - pad * 2.0,
    };

    let max_w = items.iter().map(|i| i.width).fold(0.0_f32, f32::max);
    let max_h = items.iter().map(|i| i.height).fold(0.0_f32, f32::max);
    let cell_w = max_w + spacing.gap;
    let cell_h = max_h + spacing.gap;

    let n = items.len();
    let fit = ((inner.width + spacing.gap) / cell_w).floor().max(1.0) as usize;
    let cols = fit.min(n);
    let rows = n.div_ceil(cols);

    let pitch = |count: usize, room: f32, cell: f32, largest: f32| {
        if count > 1 {
            cell.min((room - largest).max(0.0) / (count - 1) as f32)
        } else {
            0.0
        }
    };
    let step_x = pitch(cols, inner.width, cell_w, max_w);
    let step_y = pitch(rows, inner.height, cell_h, max_h);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| items[i].z_index);

    let mut placed: HashMap<usize, Point> = HashMap::with_capacity(n);
    for (slot, &i) in order.iter().enumerate() {
        let col = slot % cols;
        let row = slot / cols;
        let x = (inner.x + col as f32 * step_x)
            .min(inner.right() - items[i].width)
            .max(inner.x);
        let y = (inner.y + row as f32 * step_y)
            .min(inner.bottom() - items[i].height)
            .max(inner.y);
        placed.insert(i, Point::new(x, y));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| item.moved_to(placed[&i]))
        .collect()
}

/// Translate the selected cards so their bounding box is centered in the
/// viewport. Unselected cards are untouched; no selection means no change.
pub fn focus(items: &[CanvasItem], viewport: &Viewport) -> Vec<CanvasItem> {
    let Some(bbox) = Bounds::enclosing(items.iter().filter(|i| i.is_selected)) else {
        return items.to_vec();
    };
    let delta = viewport.center() - bbox.center();
    items
        .iter()
        .map(|item| {
            if item.is_selected {
                item.moved_to(item.position() + delta)
            } else {
                item.clone()
            }
        })
        .collect()
}

/// One above the current maximum, or 0 on an empty board.
pub fn next_z_index(items: &[CanvasItem]) -> i64 {
    items
        .iter()
        .map(|i| i.z_index)
        .max()
        .map_or(0, |max| max + 1)
}

/// Indices of selected cards in stacking order (z, then insertion).
fn selected_by_z(items: &[CanvasItem]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..items.len()).filter(|&i| items[i].is_selected).collect();
    idx.sort_by_key(|&i| items[i].z_index);
    idx
}

/// Lift the selection above everything else, keeping its internal order.
pub fn bring_to_front(items: &[CanvasItem]) -> Vec<CanvasItem> {
    let mut out = items.to_vec();
    let mut z = next_z_index(items);
    for i in selected_by_z(items) {
        out[i].z_index = z;
        z += 1;
    }
    out
}

/// Push the selection below everything else, keeping its internal order.
pub fn send_to_back(items: &[CanvasItem]) -> Vec<CanvasItem> {
    let mut out = items.to_vec();
    let order = selected_by_z(items);
    let min = items.iter().map(|i| i.z_index).min().unwrap_or(0);
    let base = min - order.len() as i64;
    for (k, i) in order.into_iter().enumerate() {
        out[i].z_index = base + k as i64;
    }
    out
}

/// Swap each selected card with the nearest unselected card directly above it.
pub fn bring_forward(items: &[CanvasItem]) -> Vec<CanvasItem> {
    shift_one(items, true)
}

/// Swap each selected card with the nearest unselected card directly below it.
pub fn send_backward(items: &[CanvasItem]) -> Vec<CanvasItem> {
    shift_one(items, false)
}

fn shift_one(items: &[CanvasItem], up: bool) -> Vec<CanvasItem> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].z_index);
    let zs: Vec<i64> = order.iter().map(|&i| items[i].z_index).collect();

    // Bubble selected entries one slot past their unselected neighbour.
    if up {
        for pos in (0..order.len().saturating_sub(1)).rev() {
            if items[order[pos]].is_selected && !items[order[pos + 1]].is_selected {
                order.swap(pos, pos + 1);
            }
        }
    } else {
        for pos in 1..order.len() {
            if items[order[pos]].is_selected && !items[order[pos - 1]].is_selected {
                order.swap(pos, pos - 1);
            }
        }
    }

    // Reassign the same z values to the new order; ties get spread apart.
    let mut out = items.to_vec();
    let mut last: Option<i64> = None;
    for (slot, &i) in order.iter().enumerate() {
        let mut z = zs[slot];
        if let Some(prev) = last
            && z <= prev
        {
            z = prev + 1;
        }
        out[i].z_index = z;
        last = Some(z);
    }
    out
}
