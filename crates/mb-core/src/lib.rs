pub mod cell;
pub mod config;
pub mod geometry;
pub mod id;
pub mod layout;
pub mod model;
pub mod selection;
pub mod store;

pub use cell::{ObservableCell, Subscription};
pub use config::{BoardConfig, ConfigError, Connection};
pub use geometry::{Bounds, DEFAULT_CENTER, PlacementCascade, Point, Size, center_of, next_positions};
pub use id::CardId;
pub use layout::{Viewport, focus, gather, viewport_center};
pub use model::*;
pub use selection::{ClickOutcome, ClickTarget, Modifiers, apply_click};
pub use store::{Board, CanvasStore};
