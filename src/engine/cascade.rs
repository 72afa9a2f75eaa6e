// ============================================================================
// Post Cascade
// ============================================================================
//
// Removing a post is one unit of work:
//
//   1. reset the post's comment status/count
//   2. bulk-remove its live comments (no per-comment hooks)
//   3. remove the post and fire POST REMOVED, unless it is already removed
//
// The transaction stays in CASCADING for the duration, so a comment hook that
// fires meanwhile leaves the reset counters alone.
//
// ============================================================================

use super::event::{LifecycleEvent, Subject};
use super::hooks::dispatch;
use crate::core::{CommentStatus, EntityKind, Field, RecordId, Result, Visibility};
use crate::model::Post;
use crate::storage::{EntityReader, EntityStore, FieldUpdate};
use crate::transaction::{TransactionState, Tx};
use serde::Serialize;
use tracing::{debug, info, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeOutcome {
    Removed,
    /// The post was already removed; nothing beyond the reset and the comment
    /// sweep was done.
    AlreadyRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub post_id: RecordId,
    pub comments_removed: usize,
    pub outcome: CascadeOutcome,
}

impl Tx<'_> {
    /// Remove a post together with its comments and decrement the author's
    /// post count.
    ///
    /// # Errors
    /// `NotFound` when no post with this id was ever created. Any other error
    /// aborts the enclosing transaction.
    pub fn remove_post(&mut self, post_id: RecordId) -> Result<CascadeReport> {
        let span = info_span!("cascade", post = %post_id);
        let _guard = span.enter();

        self.find(EntityKind::Post, post_id, Visibility::IncludeRemoved)?;
        let previous = self.enter(TransactionState::Cascading)?;
        let report = cascade_steps(self, post_id);
        self.leave(previous);
        let report = report?;

        info!(
            comments_removed = report.comments_removed,
            outcome = ?report.outcome,
            "post cascade finished"
        );
        Ok(report)
    }
}

fn cascade_steps(tx: &mut Tx<'_>, post_id: RecordId) -> Result<CascadeReport> {
    let reset = FieldUpdate::new()
        .set(Field::CommentStatus, CommentStatus::NoComments)
        .set(Field::CommentCount, 0u64);
    let affected = tx.update_fields(EntityKind::Post, post_id, &reset)?;
    debug!(affected, "counters reset");

    let comments_removed = tx.bulk_soft_remove_by_parent(EntityKind::Comment, Field::PostId, post_id)?;
    debug!(comments_removed, "comments removed");

    let live = match tx.find(EntityKind::Post, post_id, Visibility::Live) {
        Ok(_) => true,
        Err(err) if err.is_not_found() => false,
        Err(err) => return Err(err),
    };
    if !live {
        debug!("post already removed");
        return Ok(CascadeReport {
            post_id,
            comments_removed,
            outcome: CascadeOutcome::AlreadyRemoved,
        });
    }

    let removed: Post = tx.soft_remove(EntityKind::Post, post_id)?.into_record()?;
    dispatch(tx, LifecycleEvent::removed(Subject::Post(&removed)))?;

    Ok(CascadeReport {
        post_id,
        comments_removed,
        outcome: CascadeOutcome::Removed,
    })
}
