use crate::core::{DbError, EntityKind, Field, RecordId, Result, Value, Visibility};
use crate::model::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One assignment of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// `field = value`
    Set(Field, Value),
    /// `field = field + delta`, evaluated against the row at apply time
    Add(Field, i64),
}

impl Assignment {
    pub fn field(&self) -> Field {
        match self {
            Assignment::Set(field, _) | Assignment::Add(field, _) => *field,
        }
    }
}

/// Precondition evaluated against the current row before any assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    GreaterThan(Field, i64),
}

impl Guard {
    pub fn holds<R: Record>(&self, record: &R) -> Result<bool> {
        match self {
            Guard::GreaterThan(field, bound) => {
                let current = record.field(*field)?;
                let current = current.as_i64().ok_or_else(|| {
                    DbError::TypeMismatch(format!(
                        "Guard on '{}' expects INTEGER, got {}",
                        field,
                        current.type_name()
                    ))
                })?;
                Ok(current > *bound)
            }
        }
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guard::GreaterThan(field, bound) => write!(f, "{} > {}", field, bound),
        }
    }
}

/// A multi-field update applied atomically to a single live row.
///
/// ```text
/// UPDATE posts SET comment_count = comment_count - 1, comment_status = 'NO_COMMENTS'
///  WHERE id = ? AND deleted_at IS NULL AND comment_count > 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    assignments: Vec<Assignment>,
    guard: Option<Guard>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.assignments.push(Assignment::Set(field, value.into()));
        self
    }

    pub fn add(mut self, field: Field, delta: i64) -> Self {
        self.assignments.push(Assignment::Add(field, delta));
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn guard_condition(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn touches_counters(&self) -> bool {
        self.assignments.iter().any(|a| a.field().is_counter())
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Applies the assignments to a copy of `record`. The original is left
    /// untouched when any assignment fails.
    fn evaluate<R: Record>(&self, record: &R) -> Result<R> {
        let mut next = record.clone();
        for assignment in &self.assignments {
            match assignment {
                Assignment::Set(field, value) => next.set_field(*field, value.clone())?,
                Assignment::Add(field, delta) => {
                    let current = next.field(*field)?;
                    let current = current.as_i64().ok_or_else(|| {
                        DbError::TypeMismatch(format!(
                            "Cannot add to non-integer field '{}'",
                            field
                        ))
                    })?;
                    let updated = current.checked_add(*delta).ok_or_else(|| {
                        DbError::ConstraintViolation(format!("Field '{}' overflowed", field))
                    })?;
                    next.set_field(*field, Value::Integer(updated))?;
                }
            }
        }
        Ok(next)
    }
}

/// Result of a conditional update against one row.
#[derive(Debug, Clone)]
pub enum UpdateResult<R> {
    /// The row changed; carries its previous image.
    Applied { before: R },
    /// The row is live but the guard rejected the update.
    GuardRejected,
    /// No live row with that id.
    Missing,
}

impl<R> UpdateResult<R> {
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> UpdateResult<T> {
        match self {
            UpdateResult::Applied { before } => UpdateResult::Applied { before: f(before) },
            UpdateResult::GuardRejected => UpdateResult::GuardRejected,
            UpdateResult::Missing => UpdateResult::Missing,
        }
    }

    pub fn affected(&self) -> usize {
        match self {
            UpdateResult::Applied { .. } => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<R> {
    kind: EntityKind,
    rows: BTreeMap<RecordId, R>,
    next_id: u64,
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self {
            kind: R::KIND,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Assigns id and timestamps, stores the row and returns the stored copy.
    pub fn insert(&mut self, mut record: R, now: DateTime<Utc>) -> R {
        let id = RecordId(self.next_id);
        self.next_id += 1;

        let meta = record.meta_mut();
        meta.id = id;
        meta.created_at = now;
        meta.updated_at = now;
        meta.deleted_at = None;

        self.rows.insert(id, record.clone());
        record
    }

    pub fn get(&self, id: RecordId, visibility: Visibility) -> Option<&R> {
        self.rows
            .get(&id)
            .filter(|record| visibility.admits(record.is_removed()))
    }

    pub fn scan(&self, visibility: Visibility) -> impl Iterator<Item = &R> {
        self.rows
            .values()
            .filter(move |record| visibility.admits(record.is_removed()))
    }

    pub fn update(
        &mut self,
        id: RecordId,
        update: &FieldUpdate,
        now: DateTime<Utc>,
    ) -> Result<UpdateResult<R>> {
        let Some(current) = self.rows.get_mut(&id).filter(|r| !r.is_removed()) else {
            return Ok(UpdateResult::Missing);
        };

        if let Some(guard) = update.guard_condition()
            && !guard.holds(&*current)?
        {
            return Ok(UpdateResult::GuardRejected);
        }

        let mut next = update.evaluate(&*current)?;
        next.meta_mut().touch(now);
        let before = std::mem::replace(current, next);
        Ok(UpdateResult::Applied { before })
    }

    /// Sets the removal marker on a live row and returns the row as it was
    /// before removal.
    pub fn soft_remove(&mut self, id: RecordId, now: DateTime<Utc>) -> Option<R> {
        let record = self.rows.get_mut(&id)?;
        let before = record.clone();
        if !record.meta_mut().mark_removed(now) {
            return None;
        }
        Some(before)
    }

    /// Ids of live rows whose foreign key `field` equals `parent_id`.
    pub fn live_children_of(&self, field: Field, parent_id: RecordId) -> Vec<RecordId> {
        self.rows
            .values()
            .filter(|record| !record.is_removed() && record.reference(field) == Some(parent_id))
            .map(|record| record.id())
            .collect()
    }

    /// `SELECT field, COUNT(*) ... GROUP BY field`
    pub fn count_by(&self, field: Field, visibility: Visibility) -> Result<BTreeMap<RecordId, u64>> {
        if !field.is_reference() {
            return Err(DbError::ExecutionError(format!(
                "Cannot group {} by non-reference field '{}'",
                self.kind, field
            )));
        }
        let mut counts = BTreeMap::new();
        for record in self.scan(visibility) {
            if let Some(parent) = record.reference(field) {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Puts back a previous row image (rollback).
    pub fn restore(&mut self, record: R) {
        self.rows.insert(record.id(), record);
    }

    /// Physically drops a row inserted by a transaction being rolled back.
    /// The id is not handed out again.
    pub fn unlink(&mut self, id: RecordId) -> Option<R> {
        self.rows.remove(&id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommentStatus;
    use crate::model::{NewPost, Post};

    fn post_table() -> Table<Post> {
        let mut table = Table::new();
        table.insert(Post::new(NewPost::new("a", "a", RecordId(1))), Utc::now());
        table.insert(Post::new(NewPost::new("b", "b", RecordId(1))), Utc::now());
        table
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let table = post_table();
        let ids: Vec<_> = table.scan(Visibility::Live).map(|p| p.id()).collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(2)]);
    }

    #[test]
    fn test_unlinked_id_is_not_reused() {
        let mut table = post_table();
        table.unlink(RecordId(2));
        let post = table.insert(Post::new(NewPost::new("c", "c", RecordId(1))), Utc::now());
        assert_eq!(post.id(), RecordId(3));
    }

    #[test]
    fn test_guarded_update() {
        let mut table = post_table();
        let decrement = FieldUpdate::new()
            .add(Field::CommentCount, -1)
            .guard(Guard::GreaterThan(Field::CommentCount, 0));

        let result = table.update(RecordId(1), &decrement, Utc::now()).unwrap();
        assert!(matches!(result, UpdateResult::GuardRejected));
        assert_eq!(table.get(RecordId(1), Visibility::Live).unwrap().comment_count, 0);

        let reset = FieldUpdate::new()
            .set(Field::CommentStatus, CommentStatus::HasComments)
            .set(Field::CommentCount, 2i64);
        table.update(RecordId(1), &reset, Utc::now()).unwrap();

        let result = table.update(RecordId(1), &decrement, Utc::now()).unwrap();
        let UpdateResult::Applied { before } = result else {
            panic!("expected update to apply");
        };
        assert_eq!(before.comment_count, 2);
        assert_eq!(table.get(RecordId(1), Visibility::Live).unwrap().comment_count, 1);
    }

    #[test]
    fn test_unguarded_decrement_below_zero_fails_without_change() {
        let mut table = post_table();
        let decrement = FieldUpdate::new().add(Field::CommentCount, -1);
        assert!(table.update(RecordId(1), &decrement, Utc::now()).is_err());
        assert_eq!(table.get(RecordId(1), Visibility::Live).unwrap().comment_count, 0);
    }

    #[test]
    fn test_soft_removed_rows_stay_readable() {
        let mut table = post_table();
        let before = table.soft_remove(RecordId(1), Utc::now()).unwrap();
        assert!(!before.is_removed());

        assert!(table.get(RecordId(1), Visibility::Live).is_none());
        let removed = table.get(RecordId(1), Visibility::IncludeRemoved).unwrap();
        assert!(removed.is_removed());
        assert_eq!(removed.author_id, RecordId(1));

        assert!(table.soft_remove(RecordId(1), Utc::now()).is_none());
        let update = FieldUpdate::new().set(Field::Title, "x");
        assert!(matches!(
            table.update(RecordId(1), &update, Utc::now()).unwrap(),
            UpdateResult::Missing
        ));
    }

    #[test]
    fn test_count_by_reference() {
        let mut table = post_table();
        table.insert(Post::new(NewPost::new("c", "c", RecordId(2))), Utc::now());
        table.soft_remove(RecordId(1), Utc::now());

        let live = table.count_by(Field::AuthorId, Visibility::Live).unwrap();
        assert_eq!(live.get(&RecordId(1)), Some(&1));
        assert_eq!(live.get(&RecordId(2)), Some(&1));

        let all = table.count_by(Field::AuthorId, Visibility::IncludeRemoved).unwrap();
        assert_eq!(all.get(&RecordId(1)), Some(&2));
        assert!(table.count_by(Field::Title, Visibility::Live).is_err());
    }
}
