use super::{Change, Transaction, TransactionId, TransactionState};
use crate::core::{DbError, EntityKind, Field, RecordId, Result, Visibility};
use crate::model::Entity;
use crate::storage::{EntityReader, EntityStore, FieldUpdate, InMemoryStorage, UpdateResult};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// An open transaction over the locked storage.
///
/// All reads see the transaction's own writes. Dropping a `Tx` that was
/// neither committed nor rolled back rolls it back.
///
/// Posts and comments are created and removed only through the operations
/// that fire their lifecycle hooks. Raw store writes stay inside the crate:
///
/// ```compile_fail
/// use blogdb::{BlogDb, EntityKind, RecordId};
///
/// let db = BlogDb::new();
/// db.with_transaction(|tx| tx.soft_remove(EntityKind::Comment, RecordId(1)).map(|_| ()));
/// ```
///
/// ```compile_fail
/// use blogdb::engine::hooks::dispatch;
/// ```
pub struct Tx<'a> {
    storage: &'a mut InMemoryStorage,
    txn: Transaction,
    password_cost: u32,
}

impl<'a> Tx<'a> {
    pub(crate) fn begin(storage: &'a mut InMemoryStorage, password_cost: u32) -> Self {
        Self {
            storage,
            txn: Transaction::new(TransactionId::new()),
            password_cost,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.txn.id()
    }

    pub fn state(&self) -> TransactionState {
        self.txn.state()
    }

    pub fn change_count(&self) -> usize {
        self.txn.change_count()
    }

    pub(crate) fn password_cost(&self) -> u32 {
        self.password_cost
    }

    pub(crate) fn storage(&self) -> &InMemoryStorage {
        &*self.storage
    }

    pub(crate) fn enter(&mut self, phase: TransactionState) -> Result<TransactionState> {
        self.txn.enter(phase)
    }

    pub(crate) fn leave(&mut self, previous: TransactionState) {
        self.txn.leave(previous);
    }

    pub(crate) fn commit(mut self) -> Result<std::time::Duration> {
        self.txn.commit()?;
        Ok(self.txn.duration())
    }

    pub(crate) fn rollback(mut self) -> Result<usize> {
        self.txn.rollback(self.storage)
    }

    /// Conditional update of ordinary fields on one live row.
    ///
    /// # Errors
    /// `ProtectedField` for any counter or status assignment, which only the
    /// lifecycle hooks and the post cascade may write.
    pub fn update(&mut self, kind: EntityKind, id: RecordId, update: &FieldUpdate) -> Result<usize> {
        self.update_fields(kind, id, update)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.txn.state().is_terminal() {
            return Err(DbError::ExecutionError(format!(
                "Transaction {} is {}",
                self.txn.id(),
                self.txn.state()
            )));
        }
        Ok(())
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.txn.state().is_open() {
            let id = self.txn.id();
            match self.txn.rollback(self.storage) {
                Ok(undone) => warn!(txn = %id, undone, "transaction dropped while open, rolled back"),
                Err(err) => warn!(txn = %id, error = %err, "rollback on drop failed"),
            }
        }
    }
}

impl EntityReader for Tx<'_> {
    fn find(&self, kind: EntityKind, id: RecordId, visibility: Visibility) -> Result<Entity> {
        self.storage.find(kind, id, visibility)
    }

    fn scan(&self, kind: EntityKind, visibility: Visibility) -> Result<Vec<Entity>> {
        self.storage.scan(kind, visibility)
    }

    fn count_by_parent(
        &self,
        kind: EntityKind,
        parent_field: Field,
        visibility: Visibility,
    ) -> Result<BTreeMap<RecordId, u64>> {
        self.storage.count_by_parent(kind, parent_field, visibility)
    }
}

impl EntityStore for Tx<'_> {
    fn insert(&mut self, entity: Entity) -> Result<Entity> {
        self.ensure_open()?;
        if let Some(field) = entity.preset_counter() {
            return Err(DbError::ProtectedField(field));
        }
        let stored = self.storage.insert(entity, Utc::now());
        self.txn.record_change(Change::Insert {
            kind: stored.kind(),
            id: stored.id(),
        })?;
        trace!(txn = %self.txn.id(), kind = %stored.kind(), id = %stored.id(), "insert");
        Ok(stored)
    }

    fn update_fields(&mut self, kind: EntityKind, id: RecordId, update: &FieldUpdate) -> Result<usize> {
        self.ensure_open()?;
        if update.touches_counters() && !self.txn.state().allows_counter_writes() {
            let field = update
                .assignments()
                .iter()
                .map(|a| a.field())
                .find(|f| f.is_counter())
                .unwrap_or(Field::PostCount);
            return Err(DbError::ProtectedField(field));
        }

        let result = self.storage.update(kind, id, update, Utc::now())?;
        let affected = result.affected();
        if let UpdateResult::Applied { before } = result {
            self.txn.record_change(Change::Update { before })?;
        }
        trace!(txn = %self.txn.id(), %kind, %id, affected, "update");
        Ok(affected)
    }

    fn soft_remove(&mut self, kind: EntityKind, id: RecordId) -> Result<Entity> {
        self.ensure_open()?;
        let before = self
            .storage
            .soft_remove(kind, id, Utc::now())
            .ok_or_else(|| DbError::not_found(kind, id))?;
        self.txn.record_change(Change::SoftRemove { before })?;
        trace!(txn = %self.txn.id(), %kind, %id, "soft remove");
        self.storage.find(kind, id, Visibility::IncludeRemoved)
    }

    fn bulk_soft_remove_by_parent(
        &mut self,
        kind: EntityKind,
        parent_field: Field,
        parent_id: RecordId,
    ) -> Result<usize> {
        self.ensure_open()?;
        let now = Utc::now();
        let mut removed = 0;
        for id in self.storage.live_children_of(kind, parent_field, parent_id) {
            if let Some(before) = self.storage.soft_remove(kind, id, now) {
                self.txn.record_change(Change::SoftRemove { before })?;
                removed += 1;
            }
        }
        trace!(txn = %self.txn.id(), %kind, %parent_field, %parent_id, removed, "bulk soft remove");
        Ok(removed)
    }
}
