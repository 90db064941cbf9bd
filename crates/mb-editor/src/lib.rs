pub mod actions;
pub mod drag;
pub mod input;
pub mod shortcuts;
pub mod tools;
pub mod workspace;

pub use actions::{ActionError, PastePayload, Services};
pub use drag::{DragController, DragSurface, GestureOutcome};
pub use input::InputEvent;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::SelectTool;
pub use workspace::Workspace;
