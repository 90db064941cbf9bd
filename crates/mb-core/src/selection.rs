//! Selection state machine.
//!
//! The selection is never stored on its own: it is exactly the cards whose
//! `is_selected` flag is set. Every function here takes the whole board and
//! returns a new one.
//!
//! | Click | Modifiers | Result |
//! |-------|-----------|--------|
//! | background | any | deselect all |
//! | unselected card | none | select only that card |
//! | selected card | none, drag may follow | unchanged, collapse deferred to pointer-up |
//! | selected card | none, no drag | select only that card |
//! | any card | Shift / Ctrl / Cmd | toggle that card, others unchanged |

use crate::id::CardId;
use crate::model::CanvasItem;
use smallvec::SmallVec;

/// Keyboard modifiers held during a pointer or key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    /// Ctrl/Cmd or Shift: additive/subtractive selection.
    pub fn is_multi_select(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// What the pointer went down on. Decided by event target identity: a click
/// that bubbled up from a card is `Card`, even if another card overlaps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The canvas element itself.
    Background,
    Card(CardId),
}

/// Result of a click: the new board plus the card whose single-select
/// collapse was deferred until pointer-up, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    pub items: Vec<CanvasItem>,
    pub deferred: Option<CardId>,
}

/// Apply a click to the board.
///
/// `drag_may_follow` is true when the pointer-down can still turn into a
/// drag. Modifier clicks never defer.
pub fn apply_click(
    items: &[CanvasItem],
    target: ClickTarget,
    modifiers: Modifiers,
    drag_may_follow: bool,
) -> ClickOutcome {
    let id = match target {
        ClickTarget::Background => {
            return ClickOutcome {
                items: deselect_all(items),
                deferred: None,
            };
        }
        ClickTarget::Card(id) => id,
    };

    let Some(clicked) = items.iter().find(|item| item.id == id) else {
        log::debug!("click on unknown card {id}, board unchanged");
        return ClickOutcome {
            items: items.to_vec(),
            deferred: None,
        };
    };

    if modifiers.is_multi_select() {
        return ClickOutcome {
            items: toggle(items, id),
            deferred: None,
        };
    }

    if clicked.is_selected && drag_may_follow {
        return ClickOutcome {
            items: items.to_vec(),
            deferred: Some(id),
        };
    }

    ClickOutcome {
        items: select_only(items, id),
        deferred: None,
    }
}

pub fn select_only(items: &[CanvasItem], id: CardId) -> Vec<CanvasItem> {
    with_flags(items, |item| item.id == id)
}

/// Flip one card's flag, leave the rest alone.
pub fn toggle(items: &[CanvasItem], id: CardId) -> Vec<CanvasItem> {
    with_flags(items, |item| {
        if item.id == id {
            !item.is_selected
        } else {
            item.is_selected
        }
    })
}

pub fn deselect_all(items: &[CanvasItem]) -> Vec<CanvasItem> {
    with_flags(items, |_| false)
}

pub fn select_all(items: &[CanvasItem]) -> Vec<CanvasItem> {
    with_flags(items, |_| true)
}

/// Select exactly the given ids.
pub fn select_ids(items: &[CanvasItem], ids: &[CardId]) -> Vec<CanvasItem> {
    with_flags(items, |item| ids.contains(&item.id))
}

pub fn selected_ids(items: &[CanvasItem]) -> SmallVec<[CardId; 8]> {
    items
        .iter()
        .filter(|item| item.is_selected)
        .map(|item| item.id)
        .collect()
}

pub fn selected(items: &[CanvasItem]) -> impl Iterator<Item = &CanvasItem> {
    items.iter().filter(|item| item.is_selected)
}

fn with_flags(items: &[CanvasItem], flag: impl Fn(&CanvasItem) -> bool) -> Vec<CanvasItem> {
    items
        .iter()
        .map(|item| CanvasItem {
            is_selected: flag(item),
            ..item.clone()
        })
        .collect()
}
