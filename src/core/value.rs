use std::fmt;
use crate::core::{CommentStatus, DbError, Field, RecordId, Result};

/// A field value as seen by conditional updates and guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Status(CommentStatus),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::Text(_) => "TEXT",
            Self::Status(_) => "COMMENT_STATUS",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<CommentStatus> {
        match self {
            Self::Status(s) => Some(*s),
            _ => None,
        }
    }

    /// Reads this value as a counter, rejecting anything that is not a
    /// non-negative integer.
    pub fn expect_count(&self, field: Field) -> Result<u64> {
        match self {
            Self::Integer(i) if *i >= 0 => Ok(*i as u64),
            Self::Integer(i) => Err(DbError::ConstraintViolation(format!(
                "Field '{}' cannot hold negative value {}",
                field, i
            ))),
            other => Err(DbError::TypeMismatch(format!(
                "Field '{}' expects INTEGER, got {}",
                field,
                other.type_name()
            ))),
        }
    }

    pub fn expect_text(self, field: Field) -> Result<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(DbError::TypeMismatch(format!(
                "Field '{}' expects TEXT, got {}",
                field,
                other.type_name()
            ))),
        }
    }

    pub fn expect_status(&self, field: Field) -> Result<CommentStatus> {
        self.as_status().ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "Field '{}' expects COMMENT_STATUS, got {}",
                field,
                self.type_name()
            ))
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Status(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Self::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Self::from(id.0)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<CommentStatus> for Value {
    fn from(s: CommentStatus) -> Self {
        Self::Status(s)
    }
}
