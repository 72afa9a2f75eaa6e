//! Recomputes every denormalized counter from source rows and reports drift.

use crate::core::{CommentStatus, EntityKind, Field, RecordId, Result, Visibility};
use crate::model::{Comment, Post, Record, User};
use crate::storage::EntityReader;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Drift {
    PostCount {
        user_id: RecordId,
        stored: u64,
        expected: u64,
    },
    CommentCount {
        post_id: RecordId,
        stored: u64,
        expected: u64,
    },
    CommentStatus {
        post_id: RecordId,
        stored: CommentStatus,
        expected: CommentStatus,
    },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::PostCount { user_id, stored, expected } => write!(
                f,
                "User {}: post_count is {}, expected {}",
                user_id, stored, expected
            ),
            Drift::CommentCount { post_id, stored, expected } => write!(
                f,
                "Post {}: comment_count is {}, expected {}",
                post_id, stored, expected
            ),
            Drift::CommentStatus { post_id, stored, expected } => write!(
                f,
                "Post {}: comment_status is {}, expected {}",
                post_id, stored, expected
            ),
        }
    }
}

/// Compare every live user's `post_count` and every live post's
/// `comment_count`/`comment_status` against the rows they summarize.
/// An empty result means the store is consistent.
pub fn audit_counters<S: EntityReader>(store: &S) -> Result<Vec<Drift>> {
    let mut drifts = Vec::new();

    let live_posts = store.count_by_parent(EntityKind::Post, Field::AuthorId, Visibility::Live)?;
    for user in store.scan_records::<User>(Visibility::Live)? {
        let expected = live_posts.get(&user.id()).copied().unwrap_or(0);
        if user.post_count != expected {
            drifts.push(Drift::PostCount {
                user_id: user.id(),
                stored: user.post_count,
                expected,
            });
        }
    }

    let live_comments = store.count_by_parent(EntityKind::Comment, Field::PostId, Visibility::Live)?;
    let ever_commented: BTreeSet<RecordId> = store
        .scan_records::<Comment>(Visibility::IncludeRemoved)?
        .into_iter()
        .map(|comment| comment.post_id)
        .collect();

    for post in store.scan_records::<Post>(Visibility::Live)? {
        let expected = live_comments.get(&post.id()).copied().unwrap_or(0);
        if post.comment_count != expected {
            drifts.push(Drift::CommentCount {
                post_id: post.id(),
                stored: post.comment_count,
                expected,
            });
        }
        let expected_status = CommentStatus::derive(expected, ever_commented.contains(&post.id()));
        if post.comment_status != expected_status {
            drifts.push(Drift::CommentStatus {
                post_id: post.id(),
                stored: post.comment_status,
                expected: expected_status,
            });
        }
    }

    Ok(drifts)
}
