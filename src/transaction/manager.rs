// ============================================================================
// Transaction Manager
// ============================================================================

use super::{TransactionState, Tx};
use crate::core::{DbError, Result};
use crate::storage::{InMemoryStorage, SnapshotManager};
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info_span, warn};

/// Serializes transactions over the storage.
///
/// The storage mutex is held for the whole transaction, so at most one
/// transaction is open at a time and nothing it writes is visible to others
/// before it commits.
pub struct TransactionManager {
    storage: Mutex<InMemoryStorage>,
    snapshots: Option<SnapshotManager>,
    password_cost: u32,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl TransactionManager {
    pub fn new(storage: InMemoryStorage, snapshots: Option<SnapshotManager>, password_cost: u32) -> Self {
        Self {
            storage: Mutex::new(storage),
            snapshots,
            password_cost,
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
        }
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok` (after writing the snapshot, if one is
    /// configured); rolls back every write of `f` when it returns `Err` or when
    /// the snapshot cannot be written.
    pub fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T>,
    {
        let mut storage = self.lock();
        let mut tx = Tx::begin(&mut storage, self.password_cost);
        let span = info_span!("transaction", txn = %tx.id());
        let _guard = span.enter();

        let outcome = f(&mut tx).and_then(|value| {
            if tx.state() != TransactionState::Active {
                return Err(DbError::ExecutionError(format!(
                    "Transaction {} cannot commit while {}",
                    tx.id(),
                    tx.state()
                )));
            }
            if let Some(snapshots) = &self.snapshots {
                if tx.change_count() > 0 {
                    snapshots.save(tx.storage())?;
                }
            }
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                let changes = tx.change_count();
                let elapsed = tx.commit()?;
                self.committed.fetch_add(1, Ordering::Relaxed);
                debug!(changes, elapsed_us = elapsed.as_micros() as u64, "committed");
                Ok(value)
            }
            Err(err) => {
                let undone = tx.rollback()?;
                self.aborted.fetch_add(1, Ordering::Relaxed);
                if err.is_not_found() {
                    warn!(undone, error = %err, "rolled back");
                } else {
                    error!(undone, error = %err, "rolled back");
                }
                Err(err)
            }
        }
    }

    /// Run a read-only closure against committed state.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&InMemoryStorage) -> Result<T>,
    {
        let storage = self.lock();
        f(&storage)
    }

    /// A panic inside `run` poisons the mutex only after the dropped `Tx` has
    /// rolled its writes back, so the guarded storage is consistent.
    fn lock(&self) -> MutexGuard<'_, InMemoryStorage> {
        self.storage.lock().unwrap_or_else(|poisoned| {
            warn!("recovering storage after a panicked transaction");
            self.storage.clear_poison();
            poisoned.into_inner()
        })
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            committed: self.committed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub committed: u64,
    pub aborted: u64,
}
