use super::{Entity, Metadata, Record, immutable_field, kind_mismatch, unknown_field};
use crate::core::{EntityKind, Field, Result, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: Metadata,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password_hash: String,
    pub post_count: u64,
}

impl User {
    /// Builds an unsaved user from an already hashed password.
    pub fn new(input: NewUser, password_hash: String) -> Self {
        Self {
            meta: Metadata::unsaved(),
            username: input.username,
            email: input.email,
            password_hash,
            post_count: 0,
        }
    }

    /// Verifies a plain password against the stored bcrypt hash
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

/// Caller-supplied fields of a new user. Counters are not part of the input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn field(&self, field: Field) -> Result<Value> {
        match field {
            Field::Username => Ok(Value::from(self.username.as_str())),
            Field::Email => Ok(Value::from(self.email.as_str())),
            Field::PostCount => Ok(Value::from(self.post_count)),
            other => Err(unknown_field(Self::KIND, other)),
        }
    }

    fn set_field(&mut self, field: Field, value: Value) -> Result<()> {
        match field {
            Field::Username => self.username = value.expect_text(field)?,
            Field::Email => self.email = value.expect_text(field)?,
            Field::PostCount => self.post_count = value.expect_count(field)?,
            other if other.is_reference() => return Err(immutable_field(Self::KIND, other)),
            other => return Err(unknown_field(Self::KIND, other)),
        }
        Ok(())
    }

    fn into_entity(self) -> Entity {
        Entity::User(self)
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::User(user) => Ok(user),
            other => Err(kind_mismatch(Self::KIND, &other)),
        }
    }
}
