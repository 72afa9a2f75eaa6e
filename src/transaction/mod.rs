// ============================================================================
// Transaction Management Module
// ============================================================================
//
// One writer at a time: the manager holds the storage lock for the whole
// transaction. Every write records an undo entry so that an error anywhere in
// the unit of work restores the exact prior state.
//
// ============================================================================

pub mod change;
pub mod context;
pub mod manager;
pub mod state;

pub use change::Change;
pub use context::Tx;
pub use manager::{TransactionManager, TransactionStats};
pub use state::{Transaction, TransactionId, TransactionState};
