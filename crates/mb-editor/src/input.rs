//! Input abstraction layer.
//!
//! Normalizes browser pointer and keyboard events into a unified
//! `InputEvent` consumed by the select tool and the shortcut map.

use mb_core::geometry::Point;
pub use mb_core::selection::{ClickTarget, Modifiers};

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed. `target` is what the event was dispatched on: the
    /// canvas element itself, or a card the event bubbled up from.
    PointerDown {
        x: f32,
        y: f32,
        target: ClickTarget,
        modifiers: Modifiers,
    },

    /// Pointer moved anywhere in the window (global listener).
    PointerMove { x: f32, y: f32 },

    /// Pointer released anywhere in the window (global listener).
    PointerUp { x: f32, y: f32 },

    /// The gesture was torn down by the platform (pointercancel, blur).
    PointerCancel,

    /// Keyboard shortcut.
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32, target: ClickTarget, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            target,
            modifiers,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some(Point::new(*x, *y))
            }
            _ => None,
        }
    }
}
