use super::{Entity, Metadata, Record, immutable_field, kind_mismatch, unknown_field};
use crate::core::{EntityKind, Field, RecordId, Result, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(flatten)]
    pub meta: Metadata,
    pub content: String,
    pub author_id: RecordId,
    pub post_id: RecordId,
}

impl Comment {
    pub fn new(input: NewComment) -> Self {
        Self {
            meta: Metadata::unsaved(),
            content: input.content,
            author_id: input.author_id,
            post_id: input.post_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub author_id: RecordId,
    pub post_id: RecordId,
}

impl NewComment {
    pub fn new(content: impl Into<String>, author_id: RecordId, post_id: RecordId) -> Self {
        Self {
            content: content.into(),
            author_id,
            post_id,
        }
    }
}

impl Record for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn field(&self, field: Field) -> Result<Value> {
        match field {
            Field::Content => Ok(Value::from(self.content.as_str())),
            Field::AuthorId => Ok(Value::from(self.author_id)),
            Field::PostId => Ok(Value::from(self.post_id)),
            other => Err(unknown_field(Self::KIND, other)),
        }
    }

    fn set_field(&mut self, field: Field, value: Value) -> Result<()> {
        match field {
            Field::Content => self.content = value.expect_text(field)?,
            Field::AuthorId | Field::PostId => return Err(immutable_field(Self::KIND, field)),
            other => return Err(unknown_field(Self::KIND, other)),
        }
        Ok(())
    }

    fn into_entity(self) -> Entity {
        Entity::Comment(self)
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Comment(comment) => Ok(comment),
            other => Err(kind_mismatch(Self::KIND, &other)),
        }
    }
}
