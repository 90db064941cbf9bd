//! Drag engine for selected cards.
//!
//! A gesture runs in three phases:
//!
//! 1. **begin** — grab every selected card (ascending z), remember
//!    `pointer − card position` for each, lift the clicked card to the top of
//!    the stack, and attach the global move/up listeners.
//! 2. **move** — place each card at `pointer − offset` on the surface only.
//!    The store is not touched, so observers don't see every frame.
//! 3. **end** — one of three outcomes: the pointer moved, so all final
//!    positions are committed in one batched write; it never moved, so the
//!    deferred single-select collapse runs instead; or the gesture was
//!    aborted and visuals snap back. Listeners are detached in every case.

use mb_core::geometry::Point;
use mb_core::id::CardId;
use mb_core::layout::next_z_index;
use mb_core::model::CanvasItem;
use mb_core::store::CanvasStore;
use smallvec::SmallVec;

/// The visual side of the canvas the drag engine talks to.
pub trait DragSurface {
    /// Start listening for pointer move/up on the whole window, so the drag
    /// survives the pointer leaving the card.
    fn attach_global_listeners(&mut self);

    fn detach_global_listeners(&mut self);

    /// Whether the card currently has a visual element.
    fn has_visual(&self, id: CardId) -> bool;

    /// Move a card's visual element without committing to the store.
    /// Returns `false` when the element cannot be found.
    fn move_visual(&mut self, id: CardId, at: Point) -> bool;
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Pointer never moved. `collapse_to` is the card the selection was
    /// collapsed to, if a collapse had been deferred.
    NotDragged { collapse_to: Option<CardId> },
    /// Pointer moved; these positions were committed.
    Dragged { positions: Vec<(CardId, Point)> },
    /// Torn down before pointer-up; nothing committed.
    Aborted,
}

#[derive(Debug, Clone)]
struct Grip {
    id: CardId,
    offset: Point,
    origin: Point,
    current: Option<Point>,
}

#[derive(Debug)]
struct DragSession {
    pointer_start: Point,
    grips: SmallVec<[Grip; 8]>,
    moved: bool,
    deferred: Option<CardId>,
}

#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Ids being dragged, bottom of the stack first.
    pub fn dragged_ids(&self) -> Vec<CardId> {
        self.session
            .as_ref()
            .map(|s| s.grips.iter().map(|g| g.id).collect())
            .unwrap_or_default()
    }

    /// Start dragging the current selection from `primary`.
    ///
    /// Returns `false` (and starts nothing) when `primary` is not selected.
    pub fn begin(
        &mut self,
        store: &CanvasStore,
        primary: CardId,
        pointer: Point,
        deferred: Option<CardId>,
        surface: &mut dyn DragSurface,
    ) -> bool {
        if self.is_active() {
            log::debug!("drag: new gesture while one is active, aborting the old one");
            self.abort(surface);
        }

        let board = store.read();
        let mut selected: Vec<&CanvasItem> = board.iter().filter(|i| i.is_selected).collect();
        if !selected.iter().any(|i| i.id == primary) {
            return false;
        }
        selected.sort_by_key(|i| i.z_index);

        let grips: SmallVec<[Grip; 8]> = selected
            .into_iter()
            .filter(|item| {
                let found = surface.has_visual(item.id);
                if !found {
                    log::debug!("drag: no visual for {}, leaving it in place", item.id);
                }
                found
            })
            .map(|item| Grip {
                id: item.id,
                offset: pointer - item.position(),
                origin: item.position(),
                current: None,
            })
            .collect();

        store.update(|items| {
            let top = next_z_index(items);
            items
                .iter()
                .map(|item| {
                    if item.id == primary {
                        CanvasItem {
                            z_index: top,
                            ..item.clone()
                        }
                    } else {
                        item.clone()
                    }
                })
                .collect()
        });

        surface.attach_global_listeners();
        log::debug!("drag: begin from {primary} with {} card(s)", grips.len());
        self.session = Some(DragSession {
            pointer_start: pointer,
            grips,
            moved: false,
            deferred,
        });
        true
    }

    /// Visual-only update for a pointer move. Returns how many cards moved.
    pub fn pointer_move(&mut self, pointer: Point, surface: &mut dyn DragSurface) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        if pointer != session.pointer_start {
            session.moved = true;
        }
        let mut moved = 0;
        for grip in session.grips.iter_mut() {
            let at = pointer - grip.offset;
            if surface.move_visual(grip.id, at) {
                grip.current = Some(at);
                moved += 1;
            } else {
                log::trace!("drag: visual for {} vanished, skipping", grip.id);
            }
        }
        moved
    }

    /// Finish the gesture on pointer-up.
    pub fn end(&mut self, store: &CanvasStore, surface: &mut dyn DragSurface) -> Option<GestureOutcome> {
        let session = self.session.take()?;
        surface.detach_global_listeners();

        if session.moved {
            let positions: Vec<(CardId, Point)> = session
                .grips
                .iter()
                .filter_map(|g| g.current.map(|at| (g.id, at)))
                .collect();
            store.apply_positions(&positions);
            log::debug!("drag: committed {} position(s)", positions.len());
            return Some(GestureOutcome::Dragged { positions });
        }

        if let Some(id) = session.deferred {
            store.select_only(id);
            log::debug!("drag: no movement, selection collapsed to {id}");
        }
        Some(GestureOutcome::NotDragged {
            collapse_to: session.deferred,
        })
    }

    /// Tear the gesture down without committing anything.
    pub fn abort(&mut self, surface: &mut dyn DragSurface) -> Option<GestureOutcome> {
        let session = self.session.take()?;
        for grip in session.grips.iter().filter(|g| g.current.is_some()) {
            surface.move_visual(grip.id, grip.origin);
        }
        surface.detach_global_listeners();
        log::debug!("drag: aborted");
        Some(GestureOutcome::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::geometry::Size;
    use mb_core::model::CardDraft;
    use pretty_assertions::assert_eq;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeSurface {
        listening: bool,
        missing: HashSet<CardId>,
        visuals: HashMap<CardId, Point>,
    }

    impl DragSurface for FakeSurface {
        fn attach_global_listeners(&mut self) {
            self.listening = true;
        }
        fn detach_global_listeners(&mut self) {
            self.listening = false;
        }
        fn has_visual(&self, id: CardId) -> bool {
            !self.missing.contains(&id)
        }
        fn move_visual(&mut self, id: CardId, at: Point) -> bool {
            if self.missing.contains(&id) {
                return false;
            }
            self.visuals.insert(id, at);
            true
        }
    }

    fn card(store: &CanvasStore, x: f32, y: f32) -> CardId {
        store.add_card(CardDraft::text("t", Size::new(100.0, 100.0)), Point::new(x, y))
    }

    #[test]
    fn begin_requires_selected_primary() {
        let store = CanvasStore::new();
        let a = card(&store, 0.0, 0.0);
        let mut surface = FakeSurface::default();
        let mut drag = DragController::new();
        assert!(!drag.begin(&store, a, Point::default(), None, &mut surface));
        assert!(!surface.listening);
    }

    #[test]
    fn begin_lifts_primary_and_orders_by_z() {
        let store = CanvasStore::new();
        let a = card(&store, 0.0, 0.0);
        let b = card(&store, 50.0, 0.0);
        store.select_all();
        let mut surface = FakeSurface::default();
        let mut drag = DragController::new();
        assert!(drag.begin(&store, a, Point::new(10.0, 10.0), None, &mut surface));
        assert_eq!(store.get(a).unwrap().z_index, 2);
        assert_eq!(drag.dragged_ids(), vec![a, b]);
        assert!(surface.listening);
    }

    #[test]
    fn moves_are_visual_until_pointer_up() {
        let store = CanvasStore::new();
        let a = card(&store, 10.0, 20.0);
        store.select_only(a);
        let mut surface = FakeSurface::default();
        let mut drag = DragController::new();
        drag.begin(&store, a, Point::new(30.0, 40.0), None, &mut surface);

        drag.pointer_move(Point::new(60.0, 90.0), &mut surface);
        assert_eq!(surface.visuals[&a], Point::new(40.0, 70.0));
        assert_eq!(store.get(a).unwrap().position(), Point::new(10.0, 20.0));

        let outcome = drag.end(&store, &mut surface);
        assert_eq!(
            outcome,
            Some(GestureOutcome::Dragged {
                positions: vec![(a, Point::new(40.0, 70.0))]
            })
        );
        assert_eq!(store.get(a).unwrap().position(), Point::new(40.0, 70.0));
        assert!(!surface.listening);
    }

    #[test]
    fn missing_visual_is_skipped_without_stopping_others() {
        let store = CanvasStore::new();
        let a = card(&store, 0.0, 0.0);
        let ghost = card(&store, 100.0, 0.0);
        store.select_all();
        let mut surface = FakeSurface::default();
        surface.missing.insert(ghost);
        let mut drag = DragController::new();
        drag.begin(&store, a, Point::new(5.0, 5.0), None, &mut surface);
        assert_eq!(drag.pointer_move(Point::new(25.0, 5.0), &mut surface), 1);
        drag.end(&store, &mut surface);
        assert_eq!(store.get(a).unwrap().position(), Point::new(20.0, 0.0));
        assert_eq!(store.get(ghost).unwrap().position(), Point::new(100.0, 0.0));
    }

    #[test]
    fn abort_restores_visuals_and_detaches() {
        let store = CanvasStore::new();
        let a = card(&store, 0.0, 0.0);
        store.select_only(a);
        let mut surface = FakeSurface::default();
        let mut drag = DragController::new();
        drag.begin(&store, a, Point::default(), None, &mut surface);
        drag.pointer_move(Point::new(300.0, 300.0), &mut surface);
        assert_eq!(drag.abort(&mut surface), Some(GestureOutcome::Aborted));
        assert_eq!(surface.visuals[&a], Point::new(0.0, 0.0));
        assert_eq!(store.get(a).unwrap().position(), Point::new(0.0, 0.0));
        assert!(!surface.listening);
        assert!(!drag.is_active());
    }

    #[test]
    fn end_without_session_is_none() {
        let store = CanvasStore::new();
        let mut surface = FakeSurface::default();
        let mut drag = DragController::new();
        assert_eq!(drag.end(&store, &mut surface), None);
        assert_eq!(drag.abort(&mut surface), None);
    }
}
