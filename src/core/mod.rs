pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{CommentStatus, EntityKind, Field, RecordId, Visibility};
pub use value::Value;
