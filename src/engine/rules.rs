// ============================================================================
// Counter Rules
// ============================================================================
//
// Maps one lifecycle event to at most one field update against the parent
// record. All arithmetic is expressed as `field = field + n` and evaluated by
// the store against the row as it is at apply time.
//
//   POST CREATED      user.post_count += 1
//   POST REMOVED      user.post_count -= 1            guard post_count > 0
//   COMMENT CREATED   post.comment_count += 1         status already HAS_COMMENTS
//                     status = HAS_COMMENTS, count=1  otherwise
//   COMMENT REMOVED   post.comment_count -= 1         guard comment_count > 0
//                     (+ status = NO_COMMENTS when the count was 1)
//                     no-op while status is NO_COMMENTS / NEVER_COMMENTED
//                     no-op while a post cascade is running
//
// ============================================================================

use super::event::{EventKind, LifecycleEvent, Subject};
use crate::core::{CommentStatus, DbError, EntityKind, Field, RecordId, Result, Visibility};
use crate::model::{Post, Record};
use crate::storage::{EntityReader, EntityStore, FieldUpdate, Guard};
use tracing::{debug, warn};

/// A field update aimed at one parent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    pub kind: EntityKind,
    pub id: RecordId,
    pub update: FieldUpdate,
}

impl CounterUpdate {
    fn new(kind: EntityKind, id: RecordId, update: FieldUpdate) -> Self {
        Self { kind, id, update }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The guard did not hold; nothing was written.
    GuardRejected,
    /// The rules required no update for this event.
    Skipped,
}

/// Decide the counter update required by `event`.
///
/// `cascading` is true while a post cascade owns the comment counters; comment
/// removals are then left to the cascade's own reset.
pub fn decide<S: EntityReader>(
    event: &LifecycleEvent<'_>,
    cascading: bool,
    store: &S,
) -> Result<Option<CounterUpdate>> {
    match (event.kind, event.subject) {
        (EventKind::Created, Subject::Post(post)) => Ok(Some(CounterUpdate::new(
            EntityKind::User,
            post.author_id,
            FieldUpdate::new().add(Field::PostCount, 1),
        ))),

        (EventKind::Removed, Subject::Post(post)) => Ok(Some(CounterUpdate::new(
            EntityKind::User,
            post.author_id,
            FieldUpdate::new()
                .add(Field::PostCount, -1)
                .guard(Guard::GreaterThan(Field::PostCount, 0)),
        ))),

        (EventKind::Created, Subject::Comment(comment)) => {
            let parent: Post = store.find_by_id(comment.post_id, Visibility::Live)?;
            let update = match parent.comment_status {
                CommentStatus::HasComments => FieldUpdate::new().add(Field::CommentCount, 1),
                CommentStatus::NeverCommented | CommentStatus::NoComments => FieldUpdate::new()
                    .set(Field::CommentStatus, CommentStatus::HasComments)
                    .set(Field::CommentCount, 1u64),
            };
            Ok(Some(CounterUpdate::new(EntityKind::Post, parent.id(), update)))
        }

        (EventKind::Removed, Subject::Comment(_)) if cascading => Ok(None),

        (EventKind::Removed, Subject::Comment(comment)) => {
            let parent: Post = store.find_by_id(comment.post_id, Visibility::Live)?;
            match parent.comment_status {
                CommentStatus::NoComments | CommentStatus::NeverCommented => Ok(None),
                CommentStatus::HasComments => {
                    let mut update = FieldUpdate::new()
                        .add(Field::CommentCount, -1)
                        .guard(Guard::GreaterThan(Field::CommentCount, 0));
                    if parent.comment_count == 1 {
                        update = update.set(Field::CommentStatus, CommentStatus::NoComments);
                    }
                    Ok(Some(CounterUpdate::new(EntityKind::Post, parent.id(), update)))
                }
            }
        }
    }
}

/// Apply a decided update through the store.
///
/// A guarded update that matches no row is a guard rejection as long as the
/// target is still live. Any other zero-row result is a store fault.
pub(crate) fn apply<S: EntityStore>(store: &mut S, counter: &CounterUpdate) -> Result<UpdateOutcome> {
    let affected = store.update_fields(counter.kind, counter.id, &counter.update)?;
    if affected > 0 {
        debug!(kind = %counter.kind, id = %counter.id, "counter update applied");
        return Ok(UpdateOutcome::Applied);
    }

    // Resolves NotFound for a target that vanished.
    store.find(counter.kind, counter.id, Visibility::Live)?;
    match counter.update.guard_condition() {
        Some(guard) => {
            warn!(
                kind = %counter.kind,
                id = %counter.id,
                %guard,
                "counter update rejected by guard; stored counter has drifted"
            );
            Ok(UpdateOutcome::GuardRejected)
        }
        None => Err(DbError::StoreFault(format!(
            "Counter update on {} {} matched no row",
            counter.kind, counter.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Entity, NewComment, NewPost};
    use crate::storage::{Assignment, InMemoryStorage};
    use chrono::Utc;
    use std::collections::BTreeMap;

    /// Reads from real storage; every update reports zero affected rows.
    struct StaleStore(InMemoryStorage);

    impl EntityReader for StaleStore {
        fn find(&self, kind: EntityKind, id: RecordId, visibility: Visibility) -> Result<Entity> {
            self.0.find(kind, id, visibility)
        }

        fn scan(&self, kind: EntityKind, visibility: Visibility) -> Result<Vec<Entity>> {
            self.0.scan(kind, visibility)
        }

        fn count_by_parent(
            &self,
            kind: EntityKind,
            parent_field: Field,
            visibility: Visibility,
        ) -> Result<BTreeMap<RecordId, u64>> {
            self.0.count_by_parent(kind, parent_field, visibility)
        }
    }

    impl EntityStore for StaleStore {
        fn insert(&mut self, entity: Entity) -> Result<Entity> {
            Ok(self.0.insert(entity, Utc::now()))
        }

        fn update_fields(&mut self, _: EntityKind, _: RecordId, _: &FieldUpdate) -> Result<usize> {
            Ok(0)
        }

        fn soft_remove(&mut self, kind: EntityKind, id: RecordId) -> Result<Entity> {
            self.0
                .soft_remove(kind, id, Utc::now())
                .ok_or_else(|| DbError::not_found(kind, id))
        }

        fn bulk_soft_remove_by_parent(&mut self, _: EntityKind, _: Field, _: RecordId) -> Result<usize> {
            Ok(0)
        }
    }

    fn storage_with_post(status: CommentStatus, count: u64) -> (InMemoryStorage, Post) {
        let mut storage = InMemoryStorage::new();
        let mut post = Post::new(NewPost::new("t", "c", RecordId(1)));
        post.comment_status = status;
        post.comment_count = count;
        let post: Post = storage
            .insert(post.into_entity(), Utc::now())
            .into_record()
            .unwrap();
        (storage, post)
    }

    fn comment_on(post: &Post) -> Comment {
        let mut comment = Comment::new(NewComment::new("hi", RecordId(1), post.id()));
        comment.meta.id = RecordId(9);
        comment
    }

    #[test]
    fn test_post_events_target_author() {
        let storage = InMemoryStorage::new();
        let post = Post::new(NewPost::new("t", "c", RecordId(3)));

        let created = decide(&LifecycleEvent::created(Subject::Post(&post)), false, &storage)
            .unwrap()
            .unwrap();
        assert_eq!(created.kind, EntityKind::User);
        assert_eq!(created.id, RecordId(3));
        assert_eq!(created.update.assignments(), &[Assignment::Add(Field::PostCount, 1)]);
        assert!(created.update.guard_condition().is_none());

        let removed = decide(&LifecycleEvent::removed(Subject::Post(&post)), false, &storage)
            .unwrap()
            .unwrap();
        assert_eq!(removed.update.assignments(), &[Assignment::Add(Field::PostCount, -1)]);
        assert_eq!(
            removed.update.guard_condition(),
            Some(&Guard::GreaterThan(Field::PostCount, 0))
        );
    }

    #[test]
    fn test_first_comment_sets_status_and_count() {
        for status in [CommentStatus::NeverCommented, CommentStatus::NoComments] {
            let (storage, post) = storage_with_post(status, 0);
            let comment = comment_on(&post);
            let decided = decide(&LifecycleEvent::created(Subject::Comment(&comment)), false, &storage)
                .unwrap()
                .unwrap();
            assert_eq!(
                decided.update.assignments(),
                &[
                    Assignment::Set(Field::CommentStatus, CommentStatus::HasComments.into()),
                    Assignment::Set(Field::CommentCount, 1u64.into()),
                ]
            );
        }
    }

    #[test]
    fn test_further_comment_only_increments() {
        let (storage, post) = storage_with_post(CommentStatus::HasComments, 2);
        let comment = comment_on(&post);
        let decided = decide(&LifecycleEvent::created(Subject::Comment(&comment)), false, &storage)
            .unwrap()
            .unwrap();
        assert_eq!(decided.update.assignments(), &[Assignment::Add(Field::CommentCount, 1)]);
    }

    #[test]
    fn test_last_comment_removal_flips_status() {
        let (storage, post) = storage_with_post(CommentStatus::HasComments, 1);
        let comment = comment_on(&post);
        let decided = decide(&LifecycleEvent::removed(Subject::Comment(&comment)), false, &storage)
            .unwrap()
            .unwrap();
        assert_eq!(
            decided.update.assignments(),
            &[
                Assignment::Add(Field::CommentCount, -1),
                Assignment::Set(Field::CommentStatus, CommentStatus::NoComments.into()),
            ]
        );
    }

    #[test]
    fn test_comment_removal_noops() {
        for status in [CommentStatus::NoComments, CommentStatus::NeverCommented] {
            let (storage, post) = storage_with_post(status, 0);
            let comment = comment_on(&post);
            let event = LifecycleEvent::removed(Subject::Comment(&comment));
            assert!(decide(&event, false, &storage).unwrap().is_none());
        }

        let (storage, post) = storage_with_post(CommentStatus::HasComments, 4);
        let comment = comment_on(&post);
        let event = LifecycleEvent::removed(Subject::Comment(&comment));
        assert!(decide(&event, true, &storage).unwrap().is_none());
    }

    #[test]
    fn test_unguarded_update_matching_no_live_row_is_a_store_fault() {
        let (storage, post) = storage_with_post(CommentStatus::HasComments, 2);
        let mut store = StaleStore(storage);

        let bump = CounterUpdate::new(
            EntityKind::Post,
            post.id(),
            FieldUpdate::new().add(Field::CommentCount, 1),
        );
        assert!(matches!(apply(&mut store, &bump), Err(DbError::StoreFault(_))));

        let guarded = CounterUpdate::new(
            EntityKind::Post,
            post.id(),
            FieldUpdate::new()
                .add(Field::CommentCount, -1)
                .guard(Guard::GreaterThan(Field::CommentCount, 0)),
        );
        assert_eq!(apply(&mut store, &guarded).unwrap(), UpdateOutcome::GuardRejected);

        let vanished = CounterUpdate::new(EntityKind::Post, RecordId(99), bump.update.clone());
        assert!(apply(&mut store, &vanished).unwrap_err().is_not_found());
    }

    #[test]
    fn test_comment_on_missing_post_is_not_found() {
        let storage = InMemoryStorage::new();
        let post = Post::new(NewPost::new("t", "c", RecordId(1)));
        let comment = comment_on(&post);
        let err = decide(&LifecycleEvent::created(Subject::Comment(&comment)), false, &storage)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
