//! In-memory learning-path hierarchy: categories, their readings, and the
//! games nested under each reading.
//!
//! The engine is synchronous. It applies moves optimistically and hands back a
//! [`PendingMove`] that the caller settles once persistence resolves; the
//! asynchronous side lives in `crate::sync`.

mod moves;
mod sequence;

pub(crate) use moves::{Location, MoveCommand, MoveError, MoveKind, Scope};
pub(crate) use sequence::{is_sequenced, normalize_items};

#[cfg(test)]
pub(crate) use sequence::fixtures;

use crate::models::{Category, Item, ItemOrderEntry};
use sequence::{games_of, partition_items, reorder, sequence_items};

/// What was captured right before a move, and therefore what a rollback
/// restores. A category move only owns the order of the categories, never
/// their items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ScopeSnapshot {
    CategoryOrder(Vec<i64>),
    CategoryItems { category_id: i64, items: Vec<Item> },
}

/// The save request that makes a move durable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PersistRequest {
    CategoryOrder {
        learning_path_id: i64,
        category_ids: Vec<i64>,
    },
    ItemOrder {
        learning_path_id: i64,
        category_id: i64,
        items: Vec<ItemOrderEntry>,
    },
}

/// A move that has been applied locally but not yet confirmed by the backend.
#[derive(Clone, Debug)]
pub(crate) struct PendingMove {
    pub move_id: u64,
    pub kind: MoveKind,
    pub pre_snapshot: ScopeSnapshot,
    pub request: PersistRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settled {
    Confirmed,
    RolledBack,
}

/// Owns the hierarchy for one "Edit Items" session.
#[derive(Clone, Debug)]
pub(crate) struct HierarchyEngine {
    learning_path_id: i64,
    categories: Vec<Category>,
    next_move_id: u64,
}

impl HierarchyEngine {
    pub fn new(learning_path_id: i64) -> Self {
        Self {
            learning_path_id,
            categories: Vec::new(),
            next_move_id: 1,
        }
    }

    pub fn learning_path_id(&self) -> i64 {
        self.learning_path_id
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn snapshot(&self) -> Vec<Category> {
        self.categories.clone()
    }

    pub fn category(&self, category_id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.category_id == category_id)
    }

    /// Full replace from the source of truth; every category is renumbered.
    pub fn load_hierarchy(&mut self, categories: Vec<Category>) {
        self.categories = categories
            .into_iter()
            .map(|mut c| {
                c.items = normalize_items(std::mem::take(&mut c.items));
                c
            })
            .collect();

        tracing::debug!(
            learning_path_id = self.learning_path_id,
            categories = self.categories.len(),
            "hierarchy loaded"
        );
    }

    /// Replace one category's items after an authoritative refetch.
    ///
    /// Returns false when the category is no longer part of the hierarchy.
    pub fn replace_category_items(&mut self, category_id: i64, items: Vec<Item>) -> bool {
        let Some(category) = self
            .categories
            .iter_mut()
            .find(|c| c.category_id == category_id)
        else {
            return false;
        };
        category.items = normalize_items(items);
        true
    }

    /// Apply `cmd` to the in-memory hierarchy.
    ///
    /// `Ok(None)` means the move is a no-op (same position) and nothing must be
    /// emitted or persisted. On error the hierarchy is untouched.
    pub fn apply_move(&mut self, cmd: &MoveCommand) -> Result<Option<PendingMove>, MoveError> {
        cmd.validate()?;
        self.check_bounds(cmd)?;

        if cmd.is_same_position() {
            return Ok(None);
        }

        let from = cmd.source.index;
        let to = cmd.destination.index;

        let (pre_snapshot, request) = match cmd.source.scope {
            Scope::Categories => {
                let pre = ScopeSnapshot::CategoryOrder(
                    self.categories.iter().map(|c| c.category_id).collect(),
                );
                reorder(&mut self.categories, from, to);
                let request = PersistRequest::CategoryOrder {
                    learning_path_id: self.learning_path_id,
                    category_ids: self.categories.iter().map(|c| c.category_id).collect(),
                };
                (pre, request)
            }
            Scope::Readings { category_id } => {
                let category = self.category_mut(cmd.source.scope, category_id)?;
                let pre = ScopeSnapshot::CategoryItems {
                    category_id,
                    items: category.items.clone(),
                };
                let (mut readings, games) = partition_items(&category.items);
                reorder(&mut readings, from, to);
                category.items = sequence_items(readings, games);
                (pre, self.item_order_request(category_id))
            }
            Scope::Games {
                category_id,
                reading_id,
            } => {
                let category = self.category_mut(cmd.source.scope, category_id)?;
                let pre = ScopeSnapshot::CategoryItems {
                    category_id,
                    items: category.items.clone(),
                };
                let (readings, games) = partition_items(&category.items);
                let (mut owned, mut others): (Vec<Item>, Vec<Item>) =
                    games.into_iter().partition(|g| g.is_game_of(reading_id));
                reorder(&mut owned, from, to);
                others.extend(owned);
                category.items = sequence_items(readings, others);
                (pre, self.item_order_request(category_id))
            }
        };

        debug_assert!(self.categories.iter().all(|c| is_sequenced(&c.items)));

        let move_id = self.next_move_id;
        self.next_move_id += 1;

        tracing::debug!(move_id, kind = %cmd.kind, scope = %cmd.source.scope, from, to, "move applied");

        Ok(Some(PendingMove {
            move_id,
            kind: cmd.kind,
            pre_snapshot,
            request,
        }))
    }

    /// Resolve a pending move. A failed save restores exactly the values
    /// captured before that move, even if later moves have happened since.
    pub fn settle<E>(&mut self, pending: PendingMove, outcome: &Result<(), E>) -> Settled {
        if outcome.is_ok() {
            tracing::debug!(move_id = pending.move_id, "move confirmed");
            return Settled::Confirmed;
        }

        match pending.pre_snapshot {
            ScopeSnapshot::CategoryOrder(category_ids) => {
                self.restore_category_order(&category_ids);
            }
            ScopeSnapshot::CategoryItems { category_id, items } => {
                match self
                    .categories
                    .iter_mut()
                    .find(|c| c.category_id == category_id)
                {
                    Some(category) => category.items = items,
                    None => tracing::warn!(
                        move_id = pending.move_id,
                        category_id,
                        "rollback target category is gone"
                    ),
                }
            }
        }

        tracing::info!(move_id = pending.move_id, kind = %pending.kind, "move rolled back");
        Settled::RolledBack
    }

    /// Put the current categories back into `category_ids` order, keeping
    /// whatever items they hold now. Unlisted categories keep their relative
    /// order at the end.
    fn restore_category_order(&mut self, category_ids: &[i64]) {
        let rank = |category: &Category| {
            category_ids
                .iter()
                .position(|id| *id == category.category_id)
                .unwrap_or(category_ids.len())
        };
        self.categories.sort_by_key(rank);
    }

    fn item_order_request(&self, category_id: i64) -> PersistRequest {
        let items = self
            .category(category_id)
            .map(|c| c.items.iter().map(Item::order_entry).collect())
            .unwrap_or_default();
        PersistRequest::ItemOrder {
            learning_path_id: self.learning_path_id,
            category_id,
            items,
        }
    }

    fn category_mut(&mut self, scope: Scope, category_id: i64) -> Result<&mut Category, MoveError> {
        self.categories
            .iter_mut()
            .find(|c| c.category_id == category_id)
            .ok_or(MoveError::UnknownScope(scope))
    }

    /// Number of entries in the list a scope addresses.
    fn scope_len(&self, scope: Scope) -> Result<usize, MoveError> {
        match scope {
            Scope::Categories => Ok(self.categories.len()),
            Scope::Readings { category_id } => self
                .category(category_id)
                .map(|c| c.items.iter().filter(|it| it.is_reading()).count())
                .ok_or(MoveError::UnknownScope(scope)),
            Scope::Games {
                category_id,
                reading_id,
            } => {
                let category = self
                    .category(category_id)
                    .ok_or(MoveError::UnknownScope(scope))?;
                let has_reading = category
                    .items
                    .iter()
                    .any(|it| it.reading_id == Some(reading_id));
                if !has_reading {
                    return Err(MoveError::UnknownScope(scope));
                }
                Ok(games_of(&category.items, reading_id).len())
            }
        }
    }

    fn check_bounds(&self, cmd: &MoveCommand) -> Result<(), MoveError> {
        let len = self.scope_len(cmd.source.scope)?;
        for loc in [cmd.source, cmd.destination] {
            if loc.index >= len {
                return Err(MoveError::IndexOutOfRange {
                    scope: loc.scope,
                    index: loc.index,
                    len,
                });
            }
        }
        Ok(())
    }
}
