//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s.
//! On macOS `meta` is ⌘; elsewhere `ctrl` plays the same role.
//!
//! - Delete / Backspace = remove selected cards
//! - ⌘Delete = clear the board
//! - ⌘] / ⌘[ = one step forward / backward, add Shift for front / back
//! - ⌘. = stop every running generation

use mb_core::selection::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    DeleteSelected,
    /// Remove every card (⌘Delete).
    ClearBoard,
    SelectAll,
    /// Deselect all and drop any drag in progress.
    Deselect,

    // ── Z-order ──
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,

    // ── Layout ──
    Gather,
    Focus,

    // ── Tasks ──
    StopAll,
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"a"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                // Shift turns `[`/`]` into `{`/`}` on US layouts.
                "]" | "}" => Some(ShortcutAction::BringToFront),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "]" => Some(ShortcutAction::BringForward),
                "[" => Some(ShortcutAction::SendBackward),
                "." => Some(ShortcutAction::StopAll),
                "Delete" | "Backspace" => Some(ShortcutAction::ClearBoard),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteSelected),
            "Escape" => Some(ShortcutAction::Deselect),
            "g" | "G" => Some(ShortcutAction::Gather),
            "f" | "F" => Some(ShortcutAction::Focus),
            _ => None,
        }
    }

    /// [`resolve`](Self::resolve) with a [`Modifiers`] bundle.
    pub fn resolve_with(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        Self::resolve(
            key,
            modifiers.ctrl,
            modifiers.shift,
            modifiers.alt,
            modifiers.meta,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_edit_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::DeleteSelected)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::DeleteSelected)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, true),
            Some(ShortcutAction::ClearBoard)
        );
        assert_eq!(
            ShortcutMap::resolve("a", true, false, false, false),
            Some(ShortcutAction::SelectAll)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", false, false, false, false),
            Some(ShortcutAction::Deselect)
        );
    }

    #[test]
    fn resolve_z_order_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("]", false, false, false, true),
            Some(ShortcutAction::BringForward)
        );
        assert_eq!(
            ShortcutMap::resolve("[", true, false, false, false),
            Some(ShortcutAction::SendBackward)
        );
        assert_eq!(
            ShortcutMap::resolve("}", false, true, false, true),
            Some(ShortcutAction::BringToFront)
        );
        assert_eq!(
            ShortcutMap::resolve("[", true, true, false, false),
            Some(ShortcutAction::SendToBack)
        );
    }

    #[test]
    fn resolve_layout_and_task_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("g", false, false, false, false),
            Some(ShortcutAction::Gather)
        );
        assert_eq!(
            ShortcutMap::resolve("F", false, false, false, false),
            Some(ShortcutAction::Focus)
        );
        assert_eq!(
            ShortcutMap::resolve(".", false, false, false, true),
            Some(ShortcutAction::StopAll)
        );
    }

    #[test]
    fn unbound_combos_resolve_to_none() {
        assert_eq!(ShortcutMap::resolve("g", false, true, false, false), None);
        assert_eq!(ShortcutMap::resolve("g", true, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
    }

    #[test]
    fn resolve_with_modifier_bundle() {
        assert_eq!(
            ShortcutMap::resolve_with("a", Modifiers::META),
            Some(ShortcutAction::SelectAll)
        );
        assert_eq!(
            ShortcutMap::resolve_with("Delete", Modifiers::NONE),
            Some(ShortcutAction::DeleteSelected)
        );
    }
}
