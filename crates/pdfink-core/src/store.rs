//! Action store: the versioned, undoable record of annotation edits
//!
//! The store keeps two sequences: `committed` (what is currently visible, in
//! creation order) and `undone` (a LIFO stack fed by `undo`). Every operation
//! is total. Unknown ids and empty stacks are no-ops, never errors, so an
//! editing surface can call into the store without guarding each gesture.

use crate::action::{ActionId, DrawAction};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionStore {
    #[serde(skip)]
    next_id: u64,
    committed: Vec<DrawAction>,
    undone: Vec<DrawAction>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh action id for this session.
    ///
    /// Ids come from a counter. Once the counter is exhausted (a foreign
    /// `u64::MAX` id was added), the lowest id held by no stored action is
    /// returned instead.
    pub fn next_id(&mut self) -> ActionId {
        match self.next_id.checked_add(1) {
            Some(following) => {
                let id = ActionId(self.next_id);
                self.next_id = following;
                id
            }
            None => {
                let id = (0..u64::MAX)
                    .map(ActionId)
                    .find(|id| !self.holds(*id))
                    .unwrap_or(ActionId(u64::MAX));
                tracing::debug!(id = %id, "id counter exhausted, reusing a free id");
                id
            }
        }
    }

    fn holds(&self, id: ActionId) -> bool {
        self.committed.iter().chain(&self.undone).any(|a| a.id == id)
    }

    /// Append an action and truncate the redo branch.
    pub fn add_action(&mut self, action: DrawAction) {
        tracing::debug!(id = %action.id, tool = %action.tool(), page = action.page, "add action");
        // Keep allocation ahead of ids minted elsewhere (e.g. deserialized actions)
        self.next_id = self.next_id.max(action.id.0.saturating_add(1));
        self.committed.push(action);
        self.undone.clear();
    }

    /// Delete the action with `id` from the visible history.
    ///
    /// Unlike `undo`, the removed action is not redoable.
    pub fn remove_action(&mut self, id: ActionId) -> Option<DrawAction> {
        let pos = self.committed.iter().position(|a| a.id == id)?;
        tracing::debug!(id = %id, "remove action");
        Some(self.committed.remove(pos))
    }

    pub fn undo(&mut self) -> Option<ActionId> {
        let action = self.committed.pop()?;
        let id = action.id;
        tracing::debug!(id = %id, "undo");
        self.undone.push(action);
        Some(id)
    }

    /// Restore the most recently undone action at the end of the history.
    pub fn redo(&mut self) -> Option<ActionId> {
        let action = self.undone.pop()?;
        let id = action.id;
        tracing::debug!(id = %id, "redo");
        self.committed.push(action);
        Some(id)
    }

    /// Remove every action on `page`. Not reversible, so the redo stack is dropped too.
    pub fn clear_page(&mut self, page: u32) -> usize {
        let before = self.committed.len();
        self.committed.retain(|a| a.page != page);
        self.undone.clear();
        let removed = before - self.committed.len();
        tracing::debug!(page, removed, "clear page");
        removed
    }

    /// Eraser: remove the most recently committed action on `page`.
    pub fn erase_last_on_page(&mut self, page: u32) -> Option<DrawAction> {
        let id = self.last_on_page(page)?.id;
        self.remove_action(id)
    }

    pub fn can_undo(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn actions(&self) -> &[DrawAction] {
        &self.committed
    }

    pub fn undone(&self) -> &[DrawAction] {
        &self.undone
    }

    pub fn actions_for_page(&self, page: u32) -> Vec<&DrawAction> {
        self.committed.iter().filter(|a| a.page == page).collect()
    }

    pub fn last_on_page(&self, page: u32) -> Option<&DrawAction> {
        self.committed.iter().rev().find(|a| a.page == page)
    }

    pub fn get(&self, id: ActionId) -> Option<&DrawAction> {
        self.committed.iter().find(|a| a.id == id)
    }

    /// Owned copy of the visible history, for work that outlives this borrow.
    pub fn snapshot(&self) -> Vec<DrawAction> {
        self.committed.clone()
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::Point;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Undo,
        Redo,
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..4).prop_map(Op::Add),
            Just(Op::Undo),
            Just(Op::Redo),
            (0usize..8).prop_map(Op::Remove),
        ]
    }

    fn apply(store: &mut ActionStore, op: &Op) {
        match op {
            Op::Add(page) => {
                let id = store.next_id();
                store.add_action(DrawAction::stroke(
                    id,
                    *page,
                    vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
                ));
            }
            Op::Undo => {
                store.undo();
            }
            Op::Redo => {
                store.redo();
            }
            Op::Remove(idx) => {
                if let Some(id) = store.actions().get(*idx).map(|a| a.id) {
                    store.remove_action(id);
                }
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: an undo/redo pair neither loses nor duplicates actions
        #[test]
        fn undo_redo_pair_is_lossless(ops in prop::collection::vec(op(), 0..40)) {
            let mut store = ActionStore::new();
            for op in &ops {
                apply(&mut store, op);
            }
            let total = store.len() + store.undone().len();
            let had_actions = store.can_undo();
            let before = store.snapshot();

            store.undo();
            store.redo();

            prop_assert_eq!(store.len() + store.undone().len(), total);
            if had_actions {
                prop_assert_eq!(store.snapshot(), before);
            }
        }

        /// Property: redo right after a fresh add never does anything
        #[test]
        fn add_truncates_redo_branch(ops in prop::collection::vec(op(), 0..40)) {
            let mut store = ActionStore::new();
            for op in &ops {
                apply(&mut store, op);
            }
            apply(&mut store, &Op::Add(1));
            let before = store.snapshot();
            prop_assert!(!store.can_redo());
            prop_assert_eq!(store.redo(), None);
            prop_assert_eq!(store.snapshot(), before);
        }

        /// Property: removing an id leaves the undone stack alone and is idempotent
        #[test]
        fn remove_is_idempotent(ops in prop::collection::vec(op(), 0..40), idx in 0usize..8) {
            let mut store = ActionStore::new();
            for op in &ops {
                apply(&mut store, op);
            }
            let undone = store.undone().to_vec();
            if let Some(id) = store.actions().get(idx).map(|a| a.id) {
                store.remove_action(id);
                let after_first = store.snapshot();
                store.remove_action(id);
                prop_assert_eq!(store.snapshot(), after_first);
            }
            prop_assert_eq!(store.undone(), &undone[..]);
        }

        /// Property: ids in the visible history are unique
        #[test]
        fn committed_ids_are_unique(ops in prop::collection::vec(op(), 0..60)) {
            let mut store = ActionStore::new();
            for op in &ops {
                apply(&mut store, op);
            }
            let mut ids: Vec<ActionId> = store.actions().iter().map(|a| a.id).collect();
            let len = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), len);
        }
    }
}
