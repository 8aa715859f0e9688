use crate::api::{ApiError, ApiResult};
use crate::hierarchy::{HierarchyEngine, MoveCommand, MoveError, PendingMove, PersistRequest, Settled};
use crate::models::{Category, Item, ItemOrderEntry, ItemRef};
use std::cell::RefCell;
use std::rc::Rc;

/// Persistence collaborator for the "Edit Items" session.
pub(crate) trait HierarchyBackend {
    async fn fetch_hierarchy(&self, learning_path_id: i64) -> ApiResult<Vec<Category>>;

    async fn persist_category_order(
        &self,
        learning_path_id: i64,
        ordered_category_ids: &[i64],
    ) -> ApiResult<()>;

    async fn persist_item_order(
        &self,
        learning_path_id: i64,
        category_id: i64,
        ordered_items: &[ItemOrderEntry],
    ) -> ApiResult<()>;

    async fn fetch_category_items(&self, category_id: i64) -> ApiResult<Vec<Item>>;

    async fn delete_reading(&self, learning_path_id: i64, reading_id: i64) -> ApiResult<()>;

    async fn delete_game(&self, learning_path_id: i64, game_id: i64) -> ApiResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SnapshotCause {
    Loaded,
    Optimistic,
    Confirmed,
    RolledBack,
    Refreshed,
}

#[derive(Clone, Debug, thiserror::Error)]
pub(crate) enum EditorError {
    #[error(transparent)]
    Validation(#[from] MoveError),

    #[error("could not save: {0}")]
    Persistence(#[source] ApiError),

    #[error("could not reload items: {0}")]
    Refresh(#[source] ApiError),
}

impl EditorError {
    /// Blocking errors replace the editor view; the rest are notifications.
    pub fn is_blocking(&self) -> bool {
        matches!(self, EditorError::Refresh(_))
    }
}

#[derive(Clone, Debug)]
pub(crate) enum HierarchyEvent {
    Snapshot {
        categories: Vec<Category>,
        cause: SnapshotCause,
    },
    Failure(EditorError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MoveOutcome {
    /// Same position; nothing emitted, nothing persisted.
    Unchanged,
    Confirmed,
    RolledBack,
}

type Observer = Rc<dyn Fn(HierarchyEvent)>;

/// Binds a [`HierarchyEngine`] to a backend and an observer.
///
/// Moves are applied and emitted synchronously, persisted asynchronously and
/// settled against the snapshot captured for that move. Several saves may be
/// in flight at once; there is no generation check, so a slow rollback can
/// overwrite a newer optimistic state.
pub(crate) struct EditItemsSession<B> {
    engine: Rc<RefCell<HierarchyEngine>>,
    backend: Rc<B>,
    observer: Observer,
    refetch_after_save: bool,
}

impl<B> Clone for EditItemsSession<B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            backend: self.backend.clone(),
            observer: self.observer.clone(),
            refetch_after_save: self.refetch_after_save,
        }
    }
}

impl<B: HierarchyBackend> EditItemsSession<B> {
    pub fn new(
        learning_path_id: i64,
        backend: B,
        refetch_after_save: bool,
        observer: impl Fn(HierarchyEvent) + 'static,
    ) -> Self {
        Self {
            engine: Rc::new(RefCell::new(HierarchyEngine::new(learning_path_id))),
            backend: Rc::new(backend),
            observer: Rc::new(observer),
            refetch_after_save,
        }
    }

    pub fn learning_path_id(&self) -> i64 {
        self.engine.borrow().learning_path_id()
    }

    pub fn snapshot(&self) -> Vec<Category> {
        self.engine.borrow().snapshot()
    }

    fn emit_snapshot(&self, cause: SnapshotCause) {
        let categories = self.engine.borrow().snapshot();
        (self.observer)(HierarchyEvent::Snapshot { categories, cause });
    }

    fn emit_failure(&self, err: EditorError) {
        tracing::warn!(error = %err, blocking = err.is_blocking(), "edit items failure");
        (self.observer)(HierarchyEvent::Failure(err));
    }

    async fn fetch_and_load(&self, cause: SnapshotCause) -> ApiResult<()> {
        let learning_path_id = self.learning_path_id();
        let categories = self.backend.fetch_hierarchy(learning_path_id).await?;
        self.engine.borrow_mut().load_hierarchy(categories);
        self.emit_snapshot(cause);
        Ok(())
    }

    /// Full reload from the source of truth. A failure here is blocking.
    pub async fn reload(&self) -> Result<(), EditorError> {
        if let Err(e) = self.fetch_and_load(SnapshotCause::Loaded).await {
            let err = EditorError::Refresh(e);
            self.emit_failure(err.clone());
            return Err(err);
        }
        Ok(())
    }

    /// Synchronous half of a move: validate, apply, emit the optimistic
    /// snapshot. The returned record must be handed to [`Self::persist`].
    pub fn begin_move(&self, cmd: &MoveCommand) -> Result<Option<PendingMove>, EditorError> {
        let applied = self.engine.borrow_mut().apply_move(cmd);
        match applied {
            Ok(Some(pending)) => {
                self.emit_snapshot(SnapshotCause::Optimistic);
                Ok(Some(pending))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                let err = EditorError::from(e);
                self.emit_failure(err.clone());
                Err(err)
            }
        }
    }

    /// Asynchronous half of a move: save, then confirm or roll back.
    pub async fn persist(&self, pending: PendingMove) -> MoveOutcome {
        let move_id = pending.move_id;
        let result = match &pending.request {
            PersistRequest::CategoryOrder {
                learning_path_id,
                category_ids,
            } => {
                self.backend
                    .persist_category_order(*learning_path_id, category_ids)
                    .await
            }
            PersistRequest::ItemOrder {
                learning_path_id,
                category_id,
                items,
            } => {
                self.backend
                    .persist_item_order(*learning_path_id, *category_id, items)
                    .await
            }
        };

        let settled = self.engine.borrow_mut().settle(pending, &result);
        match (settled, result) {
            (Settled::Confirmed, _) => {
                if self.refetch_after_save {
                    if let Err(e) = self.fetch_and_load(SnapshotCause::Refreshed).await {
                        // The optimistic state was accepted; keep showing it.
                        tracing::warn!(move_id, error = %e, "refetch after save failed");
                    }
                } else {
                    self.emit_snapshot(SnapshotCause::Confirmed);
                }
                MoveOutcome::Confirmed
            }
            (Settled::RolledBack, result) => {
                self.emit_snapshot(SnapshotCause::RolledBack);
                if let Err(e) = result {
                    self.emit_failure(EditorError::Persistence(e));
                }
                MoveOutcome::RolledBack
            }
        }
    }

    /// Apply a move and wait for it to be saved (or rolled back).
    pub async fn apply_move(&self, cmd: &MoveCommand) -> Result<MoveOutcome, EditorError> {
        match self.begin_move(cmd)? {
            Some(pending) => Ok(self.persist(pending).await),
            None => Ok(MoveOutcome::Unchanged),
        }
    }

    /// Delete a reading (its games go with it on the backend) or a game.
    ///
    /// Nothing is removed locally until the owning category has been
    /// re-fetched. If that targeted fetch fails, the whole hierarchy is
    /// reloaded once; if that fails too, a blocking error is raised.
    pub async fn remove_item(&self, item: ItemRef) -> Result<(), EditorError> {
        let learning_path_id = self.learning_path_id();
        let deleted = match item {
            ItemRef::Reading { reading_id, .. } => {
                self.backend.delete_reading(learning_path_id, reading_id).await
            }
            ItemRef::Game { game_id, .. } => {
                self.backend.delete_game(learning_path_id, game_id).await
            }
        };
        if let Err(e) = deleted {
            let err = EditorError::Persistence(e);
            self.emit_failure(err.clone());
            return Err(err);
        }

        let category_id = item.category_id();
        match self.backend.fetch_category_items(category_id).await {
            Ok(items) => {
                let replaced = self
                    .engine
                    .borrow_mut()
                    .replace_category_items(category_id, items);
                if replaced {
                    self.emit_snapshot(SnapshotCause::Refreshed);
                    return Ok(());
                }
                tracing::warn!(category_id, "category vanished; reloading hierarchy");
            }
            Err(e) => {
                tracing::warn!(category_id, error = %e, "category refetch failed; reloading hierarchy");
            }
        }

        if let Err(e) = self.fetch_and_load(SnapshotCause::Refreshed).await {
            let err = EditorError::Refresh(e);
            self.emit_failure(err.clone());
            return Err(err);
        }
        Ok(())
    }
}
