/// Transaction Tests
///
/// Hooks run inside the transaction of their triggering write; a failure
/// anywhere in the unit of work leaves the store exactly as it was.
/// Run with: cargo test --test transaction_tests

use blogdb::{
    BlogDb, CommentStatus, DbConfig, DbError, EntityKind, NewComment, NewPost, NewUser, Record,
};
use std::thread;

fn test_db() -> BlogDb {
    BlogDb::open(DbConfig::new().password_cost(4)).unwrap()
}

#[test]
fn test_grouped_operations_commit_together() {
    let db = test_db();
    let (user, post) = db
        .with_transaction(|tx| {
            let user = tx.create_user(NewUser::new("u", "u@example.com", "pw"))?;
            let post = tx.create_post(NewPost::new("t", "c", user.id()))?;
            tx.create_comment(NewComment::new("first", user.id(), post.id()))?;
            tx.create_comment(NewComment::new("second", user.id(), post.id()))?;
            Ok((user, post))
        })
        .unwrap();

    assert_eq!(db.user(user.id()).unwrap().post_count, 1);
    assert_eq!(db.post(post.id()).unwrap().comment_count, 2);
    assert_eq!(db.transaction_stats().committed, 1);
}

#[test]
fn test_abort_discards_writes_and_counter_updates() {
    let db = test_db();
    let user = db.create_user(NewUser::new("u", "u@example.com", "pw")).unwrap();
    let post = db.create_post(NewPost::new("t", "c", user.id())).unwrap();

    let result: blogdb::Result<()> = db.with_transaction(|tx| {
        tx.create_post(NewPost::new("t2", "c", user.id()))?;
        tx.create_comment(NewComment::new("x", user.id(), post.id()))?;
        Err(DbError::StoreFault("disk full".into()))
    });
    assert!(result.is_err());

    assert_eq!(db.user(user.id()).unwrap().post_count, 1);
    let post = db.post(post.id()).unwrap();
    assert_eq!(post.comment_count, 0);
    assert_eq!(post.comment_status, CommentStatus::NeverCommented);
    assert_eq!(db.read(|s| Ok(s.row_count(EntityKind::Post))).unwrap(), 1);
    assert_eq!(db.read(|s| Ok(s.row_count(EntityKind::Comment))).unwrap(), 0);
    assert_eq!(db.transaction_stats().aborted, 1);
}

#[test]
fn test_failed_create_leaves_no_partial_rows() {
    let db = test_db();
    let user = db.create_user(NewUser::new("u", "u@example.com", "pw")).unwrap();

    let result = db.with_transaction(|tx| {
        let post = tx.create_post(NewPost::new("t", "c", user.id()))?;
        tx.create_comment(NewComment::new("x", blogdb::RecordId(99), post.id()))
    });
    assert!(matches!(result, Err(DbError::NotFound { kind: EntityKind::User, .. })));

    assert_eq!(db.user(user.id()).unwrap().post_count, 0);
    assert_eq!(db.read(|s| Ok(s.row_count(EntityKind::Post))).unwrap(), 0);
}

#[test]
fn test_removal_rollback_restores_removed_rows() {
    let db = test_db();
    let user = db.create_user(NewUser::new("u", "u@example.com", "pw")).unwrap();
    let post = db.create_post(NewPost::new("t", "c", user.id())).unwrap();
    let comment = db.create_comment(NewComment::new("x", user.id(), post.id())).unwrap();

    let result: blogdb::Result<()> = db.with_transaction(|tx| {
        tx.remove_comment(comment.id())?;
        Err(DbError::InvariantViolation("caller changed their mind".into()))
    });
    assert!(result.is_err());

    assert!(db.comment(comment.id()).is_ok());
    let post = db.post(post.id()).unwrap();
    assert_eq!(post.comment_count, 1);
    assert_eq!(post.comment_status, CommentStatus::HasComments);
}

#[test]
fn test_ids_are_not_reused_after_rollback() {
    let db = test_db();
    let user = db.create_user(NewUser::new("u", "u@example.com", "pw")).unwrap();
    let _: blogdb::Result<()> = db.with_transaction(|tx| {
        tx.create_post(NewPost::new("lost", "c", user.id()))?;
        Err(DbError::StoreFault("abort".into()))
    });
    let post = db.create_post(NewPost::new("kept", "c", user.id())).unwrap();
    assert_eq!(post.id(), blogdb::RecordId(2));
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let db = test_db();
    let user = db.create_user(NewUser::new("u", "u@example.com", "pw")).unwrap();
    let post = db.create_post(NewPost::new("t", "c", user.id())).unwrap();

    let (user_id, post_id) = (user.id(), post.id());

    thread::scope(|scope| {
        for worker in 0..4 {
            let db = &db;
            scope.spawn(move || {
                for i in 0..10 {
                    db.create_comment(NewComment::new(
                        format!("w{}-{}", worker, i),
                        user_id,
                        post_id,
                    ))
                    .unwrap();
                }
            });
        }
    });

    let post = db.post(post_id).unwrap();
    assert_eq!(post.comment_count, 40);
    assert_eq!(post.comment_status, CommentStatus::HasComments);
    assert!(db.audit_counters().unwrap().is_empty());
}
