// ============================================================================
// Lifecycle Hook Dispatch
// ============================================================================
//
// Creates and removes of posts and comments fire their hook synchronously,
// inside the same transaction and right after the triggering write. A hook
// that fails aborts the whole transaction, triggering write included.
//
// ============================================================================

use super::event::{LifecycleEvent, Subject};
use super::rules::{self, UpdateOutcome};
use crate::core::{EntityKind, RecordId, Result, Visibility};
use crate::model::{Comment, NewComment, NewPost, NewUser, Post, User};
use crate::storage::{EntityReader, EntityStore};
use crate::transaction::{TransactionState, Tx};
use tracing::debug;

/// Run the counter rules for `event` with counter writes unlocked.
pub(crate) fn dispatch(tx: &mut Tx<'_>, event: LifecycleEvent<'_>) -> Result<UpdateOutcome> {
    let previous = tx.enter(TransactionState::HookExecuting)?;
    let cascading = previous == TransactionState::Cascading;
    let outcome = match rules::decide(&event, cascading, &*tx) {
        Ok(Some(update)) => rules::apply(tx, &update),
        Ok(None) => Ok(UpdateOutcome::Skipped),
        Err(err) => Err(err),
    };
    tx.leave(previous);

    let outcome = outcome?;
    debug!(txn = %tx.id(), %event, ?outcome, "hook dispatched");
    Ok(outcome)
}

impl Tx<'_> {
    /// Create a user. The password is stored as a bcrypt hash. Users have no
    /// lifecycle hooks.
    pub fn create_user(&mut self, input: NewUser) -> Result<User> {
        let hash = bcrypt::hash(&input.password, self.password_cost())?;
        self.create(User::new(input, hash))
    }

    /// Create a post by a live author and increment the author's post count.
    pub fn create_post(&mut self, input: NewPost) -> Result<Post> {
        self.find(EntityKind::User, input.author_id, Visibility::Live)?;
        let post = self.create(Post::new(input))?;
        dispatch(self, LifecycleEvent::created(Subject::Post(&post)))?;
        Ok(post)
    }

    /// Create a comment by a live author on a live post and update the post's
    /// comment counter and status.
    pub fn create_comment(&mut self, input: NewComment) -> Result<Comment> {
        self.find(EntityKind::User, input.author_id, Visibility::Live)?;
        self.find(EntityKind::Post, input.post_id, Visibility::Live)?;
        let comment = self.create(Comment::new(input))?;
        dispatch(self, LifecycleEvent::created(Subject::Comment(&comment)))?;
        Ok(comment)
    }

    /// Soft-remove a comment and update its post's counter and status.
    pub fn remove_comment(&mut self, comment_id: RecordId) -> Result<Comment> {
        let removed: Comment = self
            .soft_remove(EntityKind::Comment, comment_id)?
            .into_record()?;
        dispatch(self, LifecycleEvent::removed(Subject::Comment(&removed)))?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommentStatus, DbError};
    use crate::model::Record;
    use crate::storage::InMemoryStorage;
    use crate::transaction::TransactionManager;
    use chrono::Utc;

    const COST: u32 = 4;

    fn seeded_manager() -> (TransactionManager, User, Post, Comment) {
        let tm = TransactionManager::new(InMemoryStorage::new(), None, COST);
        let (user, post, comment) = tm
            .run(|tx| {
                let user = tx.create_user(NewUser::new("eve", "eve@example.com", "pw"))?;
                let post = tx.create_post(NewPost::new("t", "c", user.id()))?;
                let comment = tx.create_comment(NewComment::new("x", user.id(), post.id()))?;
                Ok((user, post, comment))
            })
            .unwrap();
        (tm, user, post, comment)
    }

    #[test]
    fn test_hooks_maintain_counters_within_transaction() {
        let mut storage = InMemoryStorage::new();
        let mut tx = Tx::begin(&mut storage, COST);
        let user = tx.create_user(NewUser::new("ann", "ann@example.com", "pw")).unwrap();
        let post = tx.create_post(NewPost::new("t", "c", user.id())).unwrap();

        let user: User = tx.find_by_id(user.id(), Visibility::Live).unwrap();
        assert_eq!(user.post_count, 1);

        let first = tx.create_comment(NewComment::new("a", user.id(), post.id())).unwrap();
        tx.create_comment(NewComment::new("b", user.id(), post.id())).unwrap();
        let post_now: Post = tx.find_by_id(post.id(), Visibility::Live).unwrap();
        assert_eq!(post_now.comment_count, 2);
        assert_eq!(post_now.comment_status, CommentStatus::HasComments);

        tx.remove_comment(first.id()).unwrap();
        let post_now: Post = tx.find_by_id(post.id(), Visibility::Live).unwrap();
        assert_eq!(post_now.comment_count, 1);
        assert_eq!(post_now.comment_status, CommentStatus::HasComments);
        assert_eq!(tx.state(), TransactionState::Active);
        tx.commit().unwrap();
    }

    #[test]
    fn test_password_is_hashed() {
        let mut storage = InMemoryStorage::new();
        let mut tx = Tx::begin(&mut storage, COST);
        let user = tx.create_user(NewUser::new("bo", "bo@example.com", "secret")).unwrap();
        assert_ne!(user.password_hash, "secret");
        assert!(user.verify_password("secret"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn test_create_requires_live_parents() {
        let mut storage = InMemoryStorage::new();
        let mut tx = Tx::begin(&mut storage, COST);
        let err = tx.create_post(NewPost::new("t", "c", RecordId(42))).unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: EntityKind::User, .. }));

        let user = tx.create_user(NewUser::new("cy", "cy@example.com", "pw")).unwrap();
        let err = tx
            .create_comment(NewComment::new("x", user.id(), RecordId(7)))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: EntityKind::Post, .. }));
    }

    #[test]
    fn test_removing_a_removed_comment_is_not_found() {
        let mut storage = InMemoryStorage::new();
        let mut tx = Tx::begin(&mut storage, COST);
        let user = tx.create_user(NewUser::new("di", "di@example.com", "pw")).unwrap();
        let post = tx.create_post(NewPost::new("t", "c", user.id())).unwrap();
        let comment = tx.create_comment(NewComment::new("x", user.id(), post.id())).unwrap();

        tx.remove_comment(comment.id()).unwrap();
        assert!(tx.remove_comment(comment.id()).unwrap_err().is_not_found());

        let post_now: Post = tx.find_by_id(post.id(), Visibility::Live).unwrap();
        assert_eq!(post_now.comment_count, 0);
        assert_eq!(post_now.comment_status, CommentStatus::NoComments);
    }

    #[test]
    fn test_post_removed_on_zero_count_is_guard_rejected() {
        let mut storage = InMemoryStorage::new();
        let mut tx = Tx::begin(&mut storage, COST);
        let user = tx.create_user(NewUser::new("fay", "fay@example.com", "pw")).unwrap();
        let unstored = Post::new(NewPost::new("never stored", "c", user.id()));

        let outcome = dispatch(&mut tx, LifecycleEvent::removed(Subject::Post(&unstored))).unwrap();
        assert_eq!(outcome, UpdateOutcome::GuardRejected);
        assert_eq!(tx.state(), TransactionState::Active);
        let user: User = tx.find_by_id(user.id(), Visibility::Live).unwrap();
        assert_eq!(user.post_count, 0);
    }

    #[test]
    fn test_comment_removed_on_no_comments_is_skipped() {
        let (tm, _, post, comment) = seeded_manager();
        let outcome = tm
            .run(|tx| {
                let removed = tx.remove_comment(comment.id())?;
                dispatch(tx, LifecycleEvent::removed(Subject::Comment(&removed)))
            })
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Skipped);

        let post: Post = tm.read(|s| s.find_by_id(post.id(), Visibility::Live)).unwrap();
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.comment_status, CommentStatus::NoComments);
    }

    #[test]
    fn test_failed_post_hook_rolls_back_the_post() {
        let mut storage = InMemoryStorage::new();
        let mut user = User::new(NewUser::new("max", "max@example.com", "pw"), String::new());
        user.post_count = i64::MAX as u64;
        let user: User = storage.insert(user.into_entity(), Utc::now()).into_record().unwrap();
        let tm = TransactionManager::new(storage, None, COST);

        let err = tm
            .run(|tx| {
                let result = tx.create_post(NewPost::new("t", "c", user.id()));
                assert_eq!(tx.state(), TransactionState::Active);
                result
            })
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        let posts = tm.read(|s| Ok(s.row_count(EntityKind::Post))).unwrap();
        assert_eq!(posts, 0);
        let user: User = tm.read(|s| s.find_by_id(user.id(), Visibility::Live)).unwrap();
        assert_eq!(user.post_count, i64::MAX as u64);
    }

    #[test]
    fn test_comment_hook_on_removed_post_rolls_back_the_comment_removal() {
        let (tm, _, post, comment) = seeded_manager();

        let err = tm
            .run(|tx| {
                tx.soft_remove(EntityKind::Post, post.id())?;
                tx.remove_comment(comment.id())
            })
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: EntityKind::Post, .. }));

        let comment: Comment = tm.read(|s| s.find_by_id(comment.id(), Visibility::Live)).unwrap();
        assert!(!comment.is_removed());
        let post: Post = tm.read(|s| s.find_by_id(post.id(), Visibility::Live)).unwrap();
        assert_eq!(post.comment_count, 1);
        assert_eq!(post.comment_status, CommentStatus::HasComments);
    }
}
