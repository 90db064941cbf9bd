//! The canvas item store — single source of truth for the board.
//!
//! A thin layer over [`ObservableCell`]: every write replaces the whole
//! `Board`, so observers always see a consistent snapshot. Helpers that read
//! and write (`add_card`, `update_card`, ...) go through `update`, which
//! re-reads the latest board under the write lock. Continuations that resume
//! after an await must use these rather than a snapshot captured earlier.

use crate::cell::{ObservableCell, Subscription};
use crate::geometry::Point;
use crate::id::CardId;
use crate::layout::next_z_index;
use crate::model::{CanvasItem, CardDraft};
use crate::selection;
use std::collections::HashMap;
use std::sync::Arc;

/// The full collection of cards, in insertion order.
pub type Board = Vec<CanvasItem>;

#[derive(Clone, Default)]
pub struct CanvasStore {
    cell: ObservableCell<Board>,
}

impl CanvasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Board) -> Self {
        Self {
            cell: ObservableCell::new(items),
        }
    }

    // ─── Raw API ─────────────────────────────────────────────────────────

    /// Current snapshot.
    pub fn read(&self) -> Arc<Board> {
        self.cell.get()
    }

    /// Replace the whole board.
    pub fn replace(&self, items: Board) {
        self.cell.set(items);
    }

    /// Read-latest-then-replace in one step.
    pub fn update(&self, f: impl FnOnce(&[CanvasItem]) -> Board) -> Arc<Board> {
        self.cell.update(|items| f(items))
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&Board) + Send + Sync + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    // ─── Cards ───────────────────────────────────────────────────────────

    /// Add a card with a fresh id and the next z-index, top-left at `at`.
    pub fn add_card(&self, draft: CardDraft, at: Point) -> CardId {
        let added = self.cell.try_update(|items| {
            let id = CardId::mint_unused(|id| items.iter().any(|item| item.id == id));
            let z = next_z_index(items);
            let select = draft.select;
            let mut next: Board = if select {
                selection::deselect_all(items)
            } else {
                items.to_vec()
            };
            next.push(draft.into_item(id, at, z));
            Some((next, id))
        });
        // try_update only declines when the closure does.
        let id = added.unwrap_or_else(CardId::mint);
        log::debug!("added card {id} at ({}, {})", at.x, at.y);
        id
    }

    /// Add a card whose center sits on `center`.
    pub fn add_card_centered(&self, draft: CardDraft, center: Point) -> CardId {
        let at = draft.top_left_for_center(center);
        self.add_card(draft, at)
    }

    /// Edit one card in place. Returns `false` (and notifies nobody) when the
    /// card no longer exists.
    pub fn update_card(&self, id: CardId, f: impl FnOnce(&mut CanvasItem)) -> bool {
        self.cell
            .try_update(|items| {
                let pos = items.iter().position(|item| item.id == id)?;
                let mut next = items.to_vec();
                f(&mut next[pos]);
                Some((next, ()))
            })
            .is_some()
    }

    /// Commit a batch of positions keyed by id, as one write.
    pub fn apply_positions(&self, positions: &[(CardId, Point)]) {
        if positions.is_empty() {
            return;
        }
        let by_id: HashMap<CardId, Point> = positions.iter().copied().collect();
        self.update(|items| {
            items
                .iter()
                .map(|item| match by_id.get(&item.id) {
                    Some(at) => item.moved_to(*at),
                    None => item.clone(),
                })
                .collect()
        });
    }

    pub fn get(&self, id: CardId) -> Option<CanvasItem> {
        self.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.read().iter().any(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn next_z_index(&self) -> i64 {
        next_z_index(&self.read())
    }

    /// Remove the selected cards. Returns how many were removed.
    pub fn remove_selected(&self) -> usize {
        self.cell
            .try_update(|items| {
                let kept: Board = items.iter().filter(|i| !i.is_selected).cloned().collect();
                let removed = items.len() - kept.len();
                (removed > 0).then_some((kept, removed))
            })
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.replace(Board::new());
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// The selected cards (derived from the flags).
    pub fn selection(&self) -> Vec<CanvasItem> {
        selection::selected(&self.read()).cloned().collect()
    }

    pub fn select_only(&self, id: CardId) {
        self.update(|items| selection::select_only(items, id));
    }

    pub fn select_all(&self) {
        self.update(selection::select_all);
    }

    pub fn deselect_all(&self) {
        self.update(selection::deselect_all);
    }
}
