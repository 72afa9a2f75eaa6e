use super::engine::EntityReader;
use super::table::{FieldUpdate, Table, UpdateResult};
use crate::core::{DbError, EntityKind, Field, RecordId, Result, Visibility};
use crate::model::{Comment, Entity, Post, Record, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three entity tables. Access is serialized by the transaction manager;
/// nothing here locks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStorage {
    users: Table<User>,
    posts: Table<Post>,
    comments: Table<Comment>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &Table<User> {
        &self.users
    }

    pub fn posts(&self) -> &Table<Post> {
        &self.posts
    }

    pub fn comments(&self) -> &Table<Comment> {
        &self.comments
    }

    pub fn insert(&mut self, entity: Entity, now: DateTime<Utc>) -> Entity {
        match entity {
            Entity::User(user) => self.users.insert(user, now).into_entity(),
            Entity::Post(post) => self.posts.insert(post, now).into_entity(),
            Entity::Comment(comment) => self.comments.insert(comment, now).into_entity(),
        }
    }

    pub fn update(
        &mut self,
        kind: EntityKind,
        id: RecordId,
        update: &FieldUpdate,
        now: DateTime<Utc>,
    ) -> Result<UpdateResult<Entity>> {
        Ok(match kind {
            EntityKind::User => self.users.update(id, update, now)?.map(Record::into_entity),
            EntityKind::Post => self.posts.update(id, update, now)?.map(Record::into_entity),
            EntityKind::Comment => self.comments.update(id, update, now)?.map(Record::into_entity),
        })
    }

    /// Marks a live row removed; returns its image from before the marker was set.
    pub fn soft_remove(&mut self, kind: EntityKind, id: RecordId, now: DateTime<Utc>) -> Option<Entity> {
        match kind {
            EntityKind::User => self.users.soft_remove(id, now).map(Record::into_entity),
            EntityKind::Post => self.posts.soft_remove(id, now).map(Record::into_entity),
            EntityKind::Comment => self.comments.soft_remove(id, now).map(Record::into_entity),
        }
    }

    pub fn live_children_of(
        &self,
        kind: EntityKind,
        field: Field,
        parent_id: RecordId,
    ) -> Vec<RecordId> {
        match kind {
            EntityKind::User => self.users.live_children_of(field, parent_id),
            EntityKind::Post => self.posts.live_children_of(field, parent_id),
            EntityKind::Comment => self.comments.live_children_of(field, parent_id),
        }
    }

    pub fn restore(&mut self, entity: Entity) {
        match entity {
            Entity::User(user) => self.users.restore(user),
            Entity::Post(post) => self.posts.restore(post),
            Entity::Comment(comment) => self.comments.restore(comment),
        }
    }

    pub fn unlink(&mut self, kind: EntityKind, id: RecordId) {
        match kind {
            EntityKind::User => {
                self.users.unlink(id);
            }
            EntityKind::Post => {
                self.posts.unlink(id);
            }
            EntityKind::Comment => {
                self.comments.unlink(id);
            }
        }
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::User => self.users.row_count(),
            EntityKind::Post => self.posts.row_count(),
            EntityKind::Comment => self.comments.row_count(),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.users.row_count() + self.posts.row_count() + self.comments.row_count()
    }
}

fn lookup<R: Record>(table: &Table<R>, id: RecordId, visibility: Visibility) -> Result<Entity> {
    table
        .get(id, visibility)
        .cloned()
        .map(Record::into_entity)
        .ok_or_else(|| DbError::not_found(R::KIND, id))
}

fn collect<R: Record>(table: &Table<R>, visibility: Visibility) -> Vec<Entity> {
    table
        .scan(visibility)
        .cloned()
        .map(Record::into_entity)
        .collect()
}

impl EntityReader for InMemoryStorage {
    fn find(&self, kind: EntityKind, id: RecordId, visibility: Visibility) -> Result<Entity> {
        match kind {
            EntityKind::User => lookup(&self.users, id, visibility),
            EntityKind::Post => lookup(&self.posts, id, visibility),
            EntityKind::Comment => lookup(&self.comments, id, visibility),
        }
    }

    fn scan(&self, kind: EntityKind, visibility: Visibility) -> Result<Vec<Entity>> {
        Ok(match kind {
            EntityKind::User => collect(&self.users, visibility),
            EntityKind::Post => collect(&self.posts, visibility),
            EntityKind::Comment => collect(&self.comments, visibility),
        })
    }

    fn count_by_parent(
        &self,
        kind: EntityKind,
        parent_field: Field,
        visibility: Visibility,
    ) -> Result<BTreeMap<RecordId, u64>> {
        match kind {
            EntityKind::User => self.users.count_by(parent_field, visibility),
            EntityKind::Post => self.posts.count_by(parent_field, visibility),
            EntityKind::Comment => self.comments.count_by(parent_field, visibility),
        }
    }
}
