//! Read-only reports over the entity store.

pub mod table;

pub use table::TextTable;

use crate::core::{EntityKind, Field, RecordId, Result, Visibility};
use crate::model::{Comment, Post, Record, User};
use crate::storage::EntityReader;
use serde::Serialize;

/// Public view of a user; the password hash is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub post_count: u64,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username.clone(),
            email: user.email.clone(),
            post_count: user.post_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithComments {
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPosts {
    pub user: UserSummary,
    pub posts: Vec<PostWithComments>,
}

impl UserPosts {
    pub fn to_table(&self) -> TextTable {
        let mut table = TextTable::new(["post", "title", "comments", "status", "comment", "text"]);
        for entry in &self.posts {
            let post = &entry.post;
            if entry.comments.is_empty() {
                table.push_row([
                    post.id().to_string(),
                    post.title.clone(),
                    post.comment_count.to_string(),
                    post.comment_status.to_string(),
                    String::new(),
                    String::new(),
                ]);
            }
            for comment in &entry.comments {
                table.push_row([
                    post.id().to_string(),
                    post.title.clone(),
                    post.comment_count.to_string(),
                    post.comment_status.to_string(),
                    comment.id().to_string(),
                    comment.content.clone(),
                ]);
            }
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRanking {
    pub post: Post,
    pub live_comments: u64,
}

/// Rankings as a table.
pub fn rankings_table(rankings: &[PostRanking]) -> TextTable {
    let mut table = TextTable::new(["post", "title", "author", "live comments", "status"]);
    for ranking in rankings {
        table.push_row([
            ranking.post.id().to_string(),
            ranking.post.title.clone(),
            ranking.post.author_id.to_string(),
            ranking.live_comments.to_string(),
            ranking.post.comment_status.to_string(),
        ]);
    }
    table
}

/// A live user with each of their live posts and the post's live comments.
pub fn user_posts_with_comments<S: EntityReader>(store: &S, user_id: RecordId) -> Result<UserPosts> {
    let user: User = store.find_by_id(user_id, Visibility::Live)?;
    let comments: Vec<Comment> = store.scan_records(Visibility::Live)?;

    let posts = store
        .scan_records::<Post>(Visibility::Live)?
        .into_iter()
        .filter(|post| post.author_id == user_id)
        .map(|post| {
            let comments = comments
                .iter()
                .filter(|comment| comment.post_id == post.id())
                .cloned()
                .collect();
            PostWithComments { post, comments }
        })
        .collect();

    Ok(UserPosts {
        user: UserSummary::from(&user),
        posts,
    })
}

/// Every live post whose live comment count equals the maximum, ties included.
/// Empty when no live post has a live comment.
pub fn most_commented_posts<S: EntityReader>(store: &S) -> Result<Vec<PostRanking>> {
    let counts = store.count_by_parent(EntityKind::Comment, Field::PostId, Visibility::Live)?;
    let posts: Vec<Post> = store.scan_records(Visibility::Live)?;

    let ranked: Vec<(Post, u64)> = posts
        .into_iter()
        .filter_map(|post| counts.get(&post.id()).map(|count| (post, *count)))
        .collect();
    let Some(max) = ranked.iter().map(|(_, count)| *count).max() else {
        return Ok(Vec::new());
    };

    Ok(ranked
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(post, live_comments)| PostRanking { post, live_comments })
        .collect())
}
