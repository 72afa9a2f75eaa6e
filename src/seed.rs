//! Sample data: two authors, three posts and five comments, created through
//! the hook-firing operations so every counter is maintained.

use crate::core::{RecordId, Result};
use crate::model::{NewComment, NewPost, NewUser, Record};
use crate::transaction::Tx;
use serde::Serialize;
use tracing::info;

/// Ids of the seeded rows, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: Vec<RecordId>,
    pub posts: Vec<RecordId>,
    pub comments: Vec<RecordId>,
}

/// Author, then for each of their posts the comment texts (each comment is
/// written by the post's author).
const SAMPLE: &[(&str, &str, &[(&str, &str, &[&str])])] = &[
    (
        "alice",
        "alice@example.com",
        &[
            ("Alice's first post", "Notes on soft deletion.", &[
                "Great post 111!",
                "Great post 112!",
                "Great post 113!",
            ]),
            ("Alice's second post", "Counters that stay honest.", &["Great post 121!"]),
        ],
    ),
    (
        "bob",
        "bob@example.com",
        &[("Bob's first post", "Cascades in one transaction.", &["Great post 211!"])],
    ),
];

pub const SAMPLE_PASSWORD: &str = "hashed_password";

pub fn seed_sample_data(tx: &mut Tx<'_>) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (username, email, posts) in SAMPLE {
        let user = tx.create_user(NewUser::new(*username, *email, SAMPLE_PASSWORD))?;
        for (title, content, comments) in *posts {
            let post = tx.create_post(NewPost::new(*title, *content, user.id()))?;
            for text in *comments {
                let comment = tx.create_comment(NewComment::new(*text, user.id(), post.id()))?;
                summary.comments.push(comment.id());
            }
            summary.posts.push(post.id());
        }
        summary.users.push(user.id());
    }

    info!(
        users = summary.users.len(),
        posts = summary.posts.len(),
        comments = summary.comments.len(),
        "sample data seeded"
    );
    Ok(summary)
}
