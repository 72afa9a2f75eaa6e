// ============================================================================
// Transaction State Management
// ============================================================================
//
// A transaction moves through:
//
//   Active ──hook──> HookExecuting ──done──> Active
//     │                                        │
//     ├──cascade──> Cascading ──done──> Active │
//     │                │                       │
//     │                └──hook──> HookExecuting (nested, returns to Cascading)
//     │
//     ├──commit──> Committed
//     └──rollback──> Aborted
//
// Counter and status fields may only be written while a hook or a cascade
// is executing.
//
// ============================================================================

use super::Change;
use crate::core::{DbError, Result};
use crate::storage::InMemoryStorage;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide, monotonically increasing transaction number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Open, no hook running (a pending triggering write may be in flight)
    Active,

    /// A lifecycle hook is applying counter updates
    HookExecuting,

    /// A post cascade is in progress
    Cascading,

    Committed,

    /// Rolled back; every recorded change was undone
    Aborted,
}

impl TransactionState {
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted
        )
    }

    pub fn allows_counter_writes(&self) -> bool {
        matches!(
            self,
            TransactionState::HookExecuting | TransactionState::Cascading
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::HookExecuting => write!(f, "HOOK_EXECUTING"),
            TransactionState::Cascading => write!(f, "CASCADING"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,

    state: TransactionState,

    /// Undo records, oldest first
    changes: Vec<Change>,

    start_time: std::time::Instant,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            changes: Vec::new(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DbError::ExecutionError(format!(
                "Cannot {}: transaction {} is already {}",
                action, self.id, self.state
            )));
        }
        Ok(())
    }

    /// Append an undo record. Fails once the transaction is committed or aborted.
    pub fn record_change(&mut self, change: Change) -> Result<()> {
        self.ensure_open("record change")?;
        self.changes.push(change);
        Ok(())
    }

    /// Switch into a hook or cascade phase, returning the state to restore
    /// with [`Transaction::leave`].
    pub fn enter(&mut self, phase: TransactionState) -> Result<TransactionState> {
        self.ensure_open("enter phase")?;
        if !phase.allows_counter_writes() {
            return Err(DbError::ExecutionError(format!(
                "{} is not an execution phase",
                phase
            )));
        }
        if phase == TransactionState::Cascading && self.state != TransactionState::Active {
            return Err(DbError::ExecutionError(format!(
                "Cannot start a cascade while transaction {} is {}",
                self.id, self.state
            )));
        }
        Ok(std::mem::replace(&mut self.state, phase))
    }

    pub fn leave(&mut self, previous: TransactionState) {
        if self.state.is_open() {
            self.state = previous;
        }
    }

    /// Mark transaction as committed and drop its undo records
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open("commit")?;
        self.changes.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Undo every recorded change, newest first, and mark the transaction
    /// aborted. Returns the number of changes undone.
    pub fn rollback(&mut self, storage: &mut InMemoryStorage) -> Result<usize> {
        self.ensure_open("rollback")?;
        let undone = self.changes.len();
        while let Some(change) = self.changes.pop() {
            change.undo(storage);
        }
        self.state = TransactionState::Aborted;
        Ok(undone)
    }
}
