// ============================================================================
// blogdb Library
// ============================================================================
//
// Users, posts and comments with soft deletion, and the engine that keeps
// their denormalized counters consistent:
//
//   User.post_count       live posts by the user
//   Post.comment_count    live comments on the post
//   Post.comment_status   NEVER_COMMENTED / HAS_COMMENTS / NO_COMMENTS
//
// Counter updates run as lifecycle hooks inside the transaction of the write
// that triggers them; removing a post cascades to its comments in one
// transaction.
//
// ============================================================================

pub mod audit;
pub mod core;
pub mod engine;
pub mod facade;
pub mod model;
pub mod report;
pub mod seed;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use audit::{Drift, audit_counters};
pub use crate::core::{CommentStatus, DbError, EntityKind, Field, RecordId, Result, Value, Visibility};
pub use engine::{CascadeOutcome, CascadeReport, EventKind, LifecycleEvent, Subject, UpdateOutcome};
pub use facade::{BlogDb, DbConfig};
pub use model::{Comment, Entity, NewComment, NewPost, NewUser, Post, Record, User};
pub use report::{PostRanking, PostWithComments, UserPosts, UserSummary};
pub use seed::{SeedSummary, seed_sample_data};
pub use storage::{EntityReader, FieldUpdate, Guard};
pub use transaction::{TransactionState, Tx};
