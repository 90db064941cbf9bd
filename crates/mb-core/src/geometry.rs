//! Placement geometry: points, bounds, centers and the placement cascade.
//!
//! Everything here is pure. The cascade is the one piece with state, and it
//! only remembers how many points it has handed out so far.

use crate::model::CanvasItem;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Center used when there is nothing to measure (no items, no canvas).
pub const DEFAULT_CENTER: Point = Point { x: 400.0, y: 300.0 };

/// Default diagonal step between successive cascade positions.
pub const DEFAULT_STEP: Point = Point { x: 50.0, y: 50.0 };

/// A position (or offset) in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, k: f32) -> Point {
        Point::new(self.x * k, self.y * k)
    }
}

/// Width × height of a card.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn encloses(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Bounding box of a set of items, `None` when the set is empty.
    pub fn enclosing<'a>(items: impl IntoIterator<Item = &'a CanvasItem>) -> Option<Bounds> {
        items
            .into_iter()
            .map(CanvasItem::bounds)
            .reduce(|acc, b| acc.union(&b))
    }
}

/// Arithmetic mean of each item's own center. `DEFAULT_CENTER` when empty.
pub fn center_of<'a>(items: impl IntoIterator<Item = &'a CanvasItem>) -> Point {
    let (sum, n) = items
        .into_iter()
        .fold((Point::default(), 0usize), |(sum, n), item| {
            (sum + item.center(), n + 1)
        });
    if n == 0 {
        return DEFAULT_CENTER;
    }
    sum * (1.0 / n as f32)
}

/// Lazy, unbounded sequence of diagonally offset positions.
///
/// The first point is the anchor itself; point `i` is `anchor + step * i`.
/// Results that arrive one by one from a streaming task each pull the next
/// point, so they never land on top of each other.
#[derive(Debug, Clone)]
pub struct PlacementCascade {
    anchor: Point,
    step: Point,
    index: u32,
}

impl PlacementCascade {
    pub fn new(anchor: Point, step: Point) -> Self {
        Self {
            anchor,
            step,
            index: 0,
        }
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn step(&self) -> Point {
        self.step
    }

    /// How many points have been pulled since the last restart.
    pub fn pulled(&self) -> u32 {
        self.index
    }

    /// Start over from the anchor.
    pub fn restart(&mut self) {
        self.index = 0;
    }
}

impl Iterator for PlacementCascade {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        let point = self.anchor + self.step * self.index as f32;
        self.index = self.index.saturating_add(1);
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// Cascade anchored at the center of `items`.
pub fn next_positions<'a>(
    items: impl IntoIterator<Item = &'a CanvasItem>,
    step: Point,
) -> PlacementCascade {
    PlacementCascade::new(center_of(items), step)
}
