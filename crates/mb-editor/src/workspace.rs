//! Board workspace: the composition root.
//!
//! Owns one store, one task queue and one set of progress counters, plus the
//! select tool and the last measured viewport. Tests and the CLI each build
//! their own `Workspace`, so nothing is shared between instances.

use crate::actions::{self, ActionError, PastePayload, Services};
use crate::drag::{DragSurface, GestureOutcome};
use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::SelectTool;
use mb_core::id::CardId;
use mb_core::layout::{self, Viewport};
use mb_core::store::CanvasStore;
use mb_core::{BoardConfig, Connection};
use mb_tasks::{CacheStore, GenerationKind, Generator, Progress, TaskId, TaskQueue};
use std::sync::Arc;

pub struct Workspace {
    services: Services,
    select_tool: SelectTool,
    viewport: Option<Viewport>,
}

impl Workspace {
    pub fn new(
        config: BoardConfig,
        connection: Connection,
        generator: Arc<dyn Generator>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            services: Services::new(config, connection, generator, cache),
            select_tool: SelectTool::new(),
            viewport: None,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn store(&self) -> &CanvasStore {
        &self.services.store
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.services.queue
    }

    pub fn progress(&self) -> &Progress {
        &self.services.progress
    }

    pub fn config(&self) -> &BoardConfig {
        &self.services.config
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Record the visible area (after a resize or scroll).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn is_dragging(&self) -> bool {
        self.select_tool.is_dragging()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Route one input event. Pointer events go to the select tool; keys are
    /// resolved through the shortcut map.
    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        surface: &mut dyn DragSurface,
    ) -> Option<GestureOutcome> {
        match event {
            InputEvent::Key { key, modifiers } => {
                let action = ShortcutMap::resolve_with(key, *modifiers)?;
                self.run_shortcut(action, surface)
            }
            _ => self.select_tool.handle(event, &self.services.store, surface),
        }
    }

    /// Perform a shortcut action. Returns the gesture outcome when the action
    /// tore down a drag.
    pub fn run_shortcut(
        &mut self,
        action: ShortcutAction,
        surface: &mut dyn DragSurface,
    ) -> Option<GestureOutcome> {
        log::debug!("shortcut: {action:?}");
        let store = &self.services.store;
        match action {
            ShortcutAction::DeleteSelected => {
                let removed = store.remove_selected();
                log::info!("deleted {removed} card(s)");
            }
            ShortcutAction::ClearBoard => {
                log::info!("cleared {} card(s)", store.len());
                store.clear();
            }
            ShortcutAction::SelectAll => store.select_all(),
            ShortcutAction::Deselect => {
                let outcome = self.select_tool.cancel_gesture(surface);
                self.services.store.deselect_all();
                return outcome;
            }
            ShortcutAction::BringForward => {
                store.update(layout::bring_forward);
            }
            ShortcutAction::SendBackward => {
                store.update(layout::send_backward);
            }
            ShortcutAction::BringToFront => {
                store.update(layout::bring_to_front);
            }
            ShortcutAction::SendToBack => {
                store.update(layout::send_to_back);
            }
            ShortcutAction::Gather => self.gather(),
            ShortcutAction::Focus => self.focus(),
            ShortcutAction::StopAll => self.stop_all(),
        }
        None
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    fn viewport_or_default(&self) -> Viewport {
        self.viewport.unwrap_or_default()
    }

    /// Pull every card into the visible area.
    pub fn gather(&self) {
        let viewport = self.viewport_or_default();
        let spacing = self.services.config.gather;
        self.services
            .store
            .update(|items| layout::gather(items, &viewport, spacing));
    }

    /// Center the selection in the visible area.
    pub fn focus(&self) {
        let viewport = self.viewport_or_default();
        self.services
            .store
            .update(|items| layout::focus(items, &viewport));
    }

    // ─── Façades ─────────────────────────────────────────────────────────

    pub fn paste(&self, payloads: Vec<PastePayload>) -> Result<Vec<CardId>, ActionError> {
        actions::paste(&self.services, payloads, self.viewport.as_ref())
    }

    pub fn capture(&self, data_url: impl Into<String>) -> Result<CardId, ActionError> {
        actions::capture(&self.services, data_url, self.viewport.as_ref())
    }

    pub fn generate(&self, kind: GenerationKind, prompt: &str) -> Result<TaskId, ActionError> {
        actions::generate(&self.services, kind, prompt, self.viewport.as_ref())
    }

    // ─── Tasks ───────────────────────────────────────────────────────────

    /// Cancel every running task. Progress returns to idle as the tasks
    /// notice; `queue().wait_idle()` resolves once they all have.
    pub fn stop_all(&self) {
        self.services.queue.cancel_all();
    }

    pub fn status_text(&self) -> String {
        self.services.progress.status_text()
    }

    pub fn has_active_work(&self) -> bool {
        self.services.progress.has_active_work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ClickTarget, Modifiers};
    use mb_core::geometry::{Point, Size};
    use mb_core::model::CardDraft;
    use mb_tasks::{EchoGenerator, MemoryCache};
    use pretty_assertions::assert_eq;

    struct StaticSurface;

    impl DragSurface for StaticSurface {
        fn attach_global_listeners(&mut self) {}
        fn detach_global_listeners(&mut self) {}
        fn has_visual(&self, _id: CardId) -> bool {
            true
        }
        fn move_visual(&mut self, _id: CardId, _at: Point) -> bool {
            true
        }
    }

    fn workspace() -> Workspace {
        Workspace::new(
            BoardConfig::default(),
            Connection::new("echo", "key"),
            Arc::new(EchoGenerator::default()),
            Arc::new(MemoryCache::new()),
        )
    }

    fn add(ws: &Workspace, x: f32) -> CardId {
        ws.store()
            .add_card(CardDraft::text("n", Size::new(100.0, 100.0)), Point::new(x, 0.0))
    }

    #[test]
    fn delete_key_removes_selected_only() {
        let mut ws = workspace();
        let a = add(&ws, 0.0);
        let b = add(&ws, 200.0);
        ws.store().select_only(a);
        ws.handle_input(&InputEvent::key("Delete", Modifiers::NONE), &mut StaticSurface);
        assert!(!ws.store().contains(a));
        assert!(ws.store().contains(b));

        ws.handle_input(&InputEvent::key("Backspace", Modifiers::META), &mut StaticSurface);
        assert!(ws.store().is_empty());
    }

    #[test]
    fn escape_aborts_drag_and_deselects() {
        let mut ws = workspace();
        let a = add(&ws, 0.0);
        ws.handle_input(
            &InputEvent::pointer_down(10.0, 10.0, ClickTarget::Card(a), Modifiers::NONE),
            &mut StaticSurface,
        );
        ws.handle_input(&InputEvent::pointer_move(90.0, 10.0), &mut StaticSurface);
        assert!(ws.is_dragging());

        let outcome = ws.handle_input(&InputEvent::key("Escape", Modifiers::NONE), &mut StaticSurface);
        assert_eq!(outcome, Some(GestureOutcome::Aborted));
        assert!(!ws.is_dragging());
        assert!(ws.store().selection().is_empty());
        assert_eq!(ws.store().get(a).unwrap().position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn bring_to_front_shortcut() {
        let mut ws = workspace();
        let a = add(&ws, 0.0);
        let b = add(&ws, 200.0);
        ws.store().select_only(a);
        let cmd_shift = Modifiers {
            shift: true,
            meta: true,
            ..Modifiers::NONE
        };
        ws.handle_input(&InputEvent::key("}", cmd_shift), &mut StaticSurface);
        assert!(ws.store().get(a).unwrap().z_index > ws.store().get(b).unwrap().z_index);
    }

    #[test]
    fn gather_pulls_cards_into_viewport() {
        let mut ws = workspace();
        ws.set_viewport(Viewport::new(1000.0, 800.0));
        add(&ws, -5000.0);
        add(&ws, 9000.0);
        ws.handle_input(&InputEvent::key("g", Modifiers::NONE), &mut StaticSurface);
        let area = ws.viewport().unwrap().rect();
        for item in ws.store().read().iter() {
            assert!(area.encloses(&item.bounds()), "{} escaped", item.id);
        }
    }

    #[test]
    fn focus_centers_selection() {
        let mut ws = workspace();
        ws.set_viewport(Viewport::new(1000.0, 800.0).scrolled(100.0, 0.0));
        let a = add(&ws, 3000.0);
        ws.store().select_only(a);
        ws.focus();
        assert_eq!(ws.store().get(a).unwrap().center(), Point::new(600.0, 400.0));
    }

    #[test]
    fn idle_status_without_tasks() {
        let ws = workspace();
        assert_eq!(ws.status_text(), "Idle");
        assert!(!ws.has_active_work());
    }
}
