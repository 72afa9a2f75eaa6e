// ============================================================================
// Entity Model
// ============================================================================
//
// Users, posts and comments share the same lifecycle metadata: an
// auto-increment id, creation/update timestamps and a soft-removal marker.
//
// ============================================================================

pub mod comment;
pub mod post;
pub mod user;

pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post};
pub use user::{NewUser, User};

use crate::core::{CommentStatus, DbError, EntityKind, Field, RecordId, Result, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Metadata for a record that has not been inserted yet. The store assigns
    /// the real id and timestamps on insert.
    pub fn unsaved() -> Self {
        let now = Utc::now();
        Self {
            id: RecordId(0),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Sets the removal marker. Returns `false` if it was already set.
    pub fn mark_removed(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(at);
        self.updated_at = at;
        true
    }
}

/// A typed record stored in one of the entity tables.
pub trait Record: Clone + std::fmt::Debug + Sized {
    const KIND: EntityKind;

    fn meta(&self) -> &Metadata;

    fn meta_mut(&mut self) -> &mut Metadata;

    fn field(&self, field: Field) -> Result<Value>;

    fn set_field(&mut self, field: Field, value: Value) -> Result<()>;

    fn into_entity(self) -> Entity;

    fn from_entity(entity: Entity) -> Result<Self>;

    fn id(&self) -> RecordId {
        self.meta().id
    }

    fn is_removed(&self) -> bool {
        self.meta().is_removed()
    }

    /// Reads a foreign key field, if the record has one.
    fn reference(&self, field: Field) -> Option<RecordId> {
        if !field.is_reference() {
            return None;
        }
        self.field(field)
            .ok()
            .and_then(|value| value.as_i64())
            .and_then(|raw| u64::try_from(raw).ok())
            .map(RecordId)
    }
}

pub(crate) fn unknown_field(kind: EntityKind, field: Field) -> DbError {
    DbError::FieldNotFound { kind, field }
}

pub(crate) fn immutable_field(kind: EntityKind, field: Field) -> DbError {
    DbError::ConstraintViolation(format!(
        "Field '{}' of {} is fixed at creation",
        field, kind
    ))
}

/// Any stored record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    User(User),
    Post(Post),
    Comment(Comment),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Post(_) => EntityKind::Post,
            Entity::Comment(_) => EntityKind::Comment,
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Entity::User(user) => user.meta(),
            Entity::Post(post) => post.meta(),
            Entity::Comment(comment) => comment.meta(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.meta().id
    }

    pub fn is_removed(&self) -> bool {
        self.meta().is_removed()
    }

    pub fn field(&self, field: Field) -> Result<Value> {
        match self {
            Entity::User(user) => user.field(field),
            Entity::Post(post) => post.field(field),
            Entity::Comment(comment) => comment.field(field),
        }
    }

    pub fn into_record<R: Record>(self) -> Result<R> {
        R::from_entity(self)
    }

    /// First counter field that is not at its creation value. New records
    /// start from zero counters; only hooks move them.
    pub(crate) fn preset_counter(&self) -> Option<Field> {
        match self {
            Entity::User(user) if user.post_count != 0 => Some(Field::PostCount),
            Entity::Post(post) if post.comment_count != 0 => Some(Field::CommentCount),
            Entity::Post(post) if post.comment_status != CommentStatus::NeverCommented => {
                Some(Field::CommentStatus)
            }
            _ => None,
        }
    }
}

pub(crate) fn kind_mismatch(expected: EntityKind, actual: &Entity) -> DbError {
    DbError::TypeMismatch(format!(
        "Expected {} record, got {}",
        expected,
        actual.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_removed_is_monotonic() {
        let mut meta = Metadata::unsaved();
        let at = Utc::now();
        assert!(meta.mark_removed(at));
        assert!(meta.is_removed());
        assert!(!meta.mark_removed(Utc::now()));
        assert_eq!(meta.deleted_at, Some(at));
    }

    #[test]
    fn test_entity_round_trips_to_record() {
        let post = Post::new(NewPost::new("title", "body", RecordId(1)));
        let entity = post.clone().into_entity();
        assert_eq!(entity.kind(), EntityKind::Post);
        let back: Post = entity.clone().into_record().unwrap();
        assert_eq!(back, post);
        assert!(entity.into_record::<Comment>().is_err());
    }

    #[test]
    fn test_preset_counter_detection() {
        let fresh = Post::new(NewPost::new("t", "c", RecordId(1)));
        assert_eq!(fresh.clone().into_entity().preset_counter(), None);

        let mut status_only = fresh.clone();
        status_only.comment_status = CommentStatus::NoComments;
        assert_eq!(status_only.into_entity().preset_counter(), Some(Field::CommentStatus));

        let mut user = User::new(NewUser::new("u", "u@x", "pw"), String::new());
        user.post_count = 2;
        assert_eq!(user.into_entity().preset_counter(), Some(Field::PostCount));
    }
}
