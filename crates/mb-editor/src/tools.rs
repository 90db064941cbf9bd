//! Select tool: pointer events → selection changes and drags.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Click on card | Click on background |
//! |----------|---------------|---------------------|
//! | none | select only it (deferred if already selected) | deselect all |
//! | **Shift** / **Ctrl** / **Cmd** | toggle it | deselect all |

use crate::drag::{DragController, DragSurface, GestureOutcome};
use crate::input::InputEvent;
use mb_core::geometry::Point;
use mb_core::selection::{ClickTarget, apply_click};
use mb_core::store::CanvasStore;

#[derive(Debug, Default)]
pub struct SelectTool {
    drag: DragController,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// Handle a pointer event. Returns the gesture outcome when one ends.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        store: &CanvasStore,
        surface: &mut dyn DragSurface,
    ) -> Option<GestureOutcome> {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                target,
                modifiers,
            } => {
                let stale = self.drag.abort(surface);
                let outcome = apply_click(&store.read(), *target, *modifiers, true);
                if outcome.deferred.is_none() {
                    store.replace(outcome.items);
                }
                if let ClickTarget::Card(id) = target {
                    self.drag
                        .begin(store, *id, Point::new(*x, *y), outcome.deferred, surface);
                }
                stale
            }
            InputEvent::PointerMove { x, y } => {
                let moved = self.drag.pointer_move(Point::new(*x, *y), surface);
                if moved > 0 {
                    log::trace!("select: moved {moved} card(s) to pointer ({x}, {y})");
                }
                None
            }
            InputEvent::PointerUp { x, y } => {
                if self.drag.is_active() {
                    self.drag.pointer_move(Point::new(*x, *y), surface);
                }
                self.drag.end(store, surface)
            }
            InputEvent::PointerCancel => self.drag.abort(surface),
            InputEvent::Key { .. } => None,
        }
    }

    /// Abort any gesture in progress (Escape, window blur).
    pub fn cancel_gesture(&mut self, surface: &mut dyn DragSurface) -> Option<GestureOutcome> {
        self.drag.abort(surface)
    }
}
