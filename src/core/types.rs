use serde::{Deserialize, Serialize};
use std::fmt;

/// Auto-increment identifier of a stored record.
///
/// Identifiers start at 1 for every entity kind and are never reused, not even
/// when the transaction that allocated them rolls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Post,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "User"),
            EntityKind::Post => write!(f, "Post"),
            EntityKind::Comment => write!(f, "Comment"),
        }
    }
}

/// Addressable record fields for conditional updates and grouped aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Username,
    Email,
    Title,
    Content,
    AuthorId,
    PostId,
    PostCount,
    CommentCount,
    CommentStatus,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Title => "title",
            Field::Content => "content",
            Field::AuthorId => "author_id",
            Field::PostId => "post_id",
            Field::PostCount => "post_count",
            Field::CommentCount => "comment_count",
            Field::CommentStatus => "comment_status",
        }
    }

    /// Denormalized fields owned by the counter engine.
    pub fn is_counter(&self) -> bool {
        matches!(
            self,
            Field::PostCount | Field::CommentCount | Field::CommentStatus
        )
    }

    /// Foreign keys are fixed at creation time.
    pub fn is_reference(&self) -> bool {
        matches!(self, Field::AuthorId | Field::PostId)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether soft-removed rows take part in a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Live,
    IncludeRemoved,
}

impl Visibility {
    pub fn admits(&self, removed: bool) -> bool {
        match self {
            Visibility::Live => !removed,
            Visibility::IncludeRemoved => true,
        }
    }
}

/// Tri-state comment status of a post.
///
/// `NeverCommented` and `NoComments` both mean "zero live comments", but only the
/// latter remembers that the post once had some.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    #[default]
    NeverCommented,
    HasComments,
    NoComments,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::NeverCommented => "NEVER_COMMENTED",
            CommentStatus::HasComments => "HAS_COMMENTS",
            CommentStatus::NoComments => "NO_COMMENTS",
        }
    }

    /// Status a post should carry given its live comment count and whether any
    /// comment row, live or removed, was ever created for it.
    pub fn derive(live_comments: u64, ever_commented: bool) -> Self {
        if live_comments > 0 {
            CommentStatus::HasComments
        } else if ever_commented {
            CommentStatus::NoComments
        } else {
            CommentStatus::NeverCommented
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
