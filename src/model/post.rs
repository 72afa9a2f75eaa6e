use super::{Entity, Metadata, Record, immutable_field, kind_mismatch, unknown_field};
use crate::core::{CommentStatus, EntityKind, Field, RecordId, Result, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: Metadata,
    pub title: String,
    pub content: String,
    pub author_id: RecordId,
    pub comment_count: u64,
    pub comment_status: CommentStatus,
}

impl Post {
    pub fn new(input: NewPost) -> Self {
        Self {
            meta: Metadata::unsaved(),
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            comment_count: 0,
            comment_status: CommentStatus::NeverCommented,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: RecordId,
}

impl NewPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: RecordId) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author_id,
        }
    }
}

impl Record for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn field(&self, field: Field) -> Result<Value> {
        match field {
            Field::Title => Ok(Value::from(self.title.as_str())),
            Field::Content => Ok(Value::from(self.content.as_str())),
            Field::AuthorId => Ok(Value::from(self.author_id)),
            Field::CommentCount => Ok(Value::from(self.comment_count)),
            Field::CommentStatus => Ok(Value::from(self.comment_status)),
            other => Err(unknown_field(Self::KIND, other)),
        }
    }

    fn set_field(&mut self, field: Field, value: Value) -> Result<()> {
        match field {
            Field::Title => self.title = value.expect_text(field)?,
            Field::Content => self.content = value.expect_text(field)?,
            Field::CommentCount => self.comment_count = value.expect_count(field)?,
            Field::CommentStatus => self.comment_status = value.expect_status(field)?,
            Field::AuthorId => return Err(immutable_field(Self::KIND, field)),
            other => return Err(unknown_field(Self::KIND, other)),
        }
        Ok(())
    }

    fn into_entity(self) -> Entity {
        Entity::Post(self)
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Post(post) => Ok(post),
            other => Err(kind_mismatch(Self::KIND, &other)),
        }
    }
}
