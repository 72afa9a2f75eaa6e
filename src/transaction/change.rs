// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Every write inside a transaction leaves an undo record. Rollback replays
// the records newest first; commit simply forgets them.
//
// ============================================================================

use crate::core::{EntityKind, RecordId};
use crate::model::Entity;
use crate::storage::InMemoryStorage;

#[derive(Debug, Clone)]
pub enum Change {
    /// A row was inserted; undo drops it.
    Insert { kind: EntityKind, id: RecordId },

    /// Fields of a row changed; undo restores the previous image.
    Update { before: Entity },

    /// The removal marker was set; undo restores the unmarked image.
    SoftRemove { before: Entity },
}

impl Change {
    pub(crate) fn undo(self, storage: &mut InMemoryStorage) {
        match self {
            Change::Insert { kind, id } => storage.unlink(kind, id),
            Change::Update { before } | Change::SoftRemove { before } => storage.restore(before),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Visibility;
    use crate::model::{NewPost, Post, Record};
    use crate::storage::EntityReader;
    use chrono::Utc;

    #[test]
    fn test_undo_insert_unlinks_row() {
        let mut storage = InMemoryStorage::new();
        let post = storage.insert(Post::new(NewPost::new("t", "c", RecordId(1))).into_entity(), Utc::now());

        Change::Insert {
            kind: EntityKind::Post,
            id: post.id(),
        }
        .undo(&mut storage);

        assert_eq!(storage.row_count(EntityKind::Post), 0);
    }

    #[test]
    fn test_undo_soft_remove() {
        let mut storage = InMemoryStorage::new();
        let now = Utc::now();
        let post = storage.insert(Post::new(NewPost::new("t", "c", RecordId(1))).into_entity(), now);
        let before = storage.soft_remove(EntityKind::Post, post.id(), now).unwrap();

        Change::SoftRemove { before }.undo(&mut storage);

        assert!(storage.find(EntityKind::Post, post.id(), Visibility::Live).is_ok());
    }
}
