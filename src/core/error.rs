use crate::core::{EntityKind, Field, RecordId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("Field '{field}' not found on {kind}")]
    FieldNotFound { kind: EntityKind, field: Field },

    #[error("Store fault: {0}")]
    StoreFault(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Field '{0}' is maintained by the counter engine and cannot be written directly")]
    ProtectedField(Field),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl DbError {
    pub fn not_found(kind: EntityKind, id: RecordId) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for DbError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::PasswordHash(err.to_string())
    }
}
