// ============================================================================
// Consistency Engine
// ============================================================================
//
// Lifecycle events, the counter rules that react to them, the hook
// dispatcher that runs those rules inside the triggering transaction, and the
// post cascade.
//
// ============================================================================

pub mod cascade;
pub mod event;
mod hooks;
pub mod rules;

pub use cascade::{CascadeOutcome, CascadeReport};
pub use event::{EventKind, LifecycleEvent, Subject};
pub use rules::{CounterUpdate, UpdateOutcome};
