use super::table::FieldUpdate;
use crate::core::{EntityKind, Field, RecordId, Result, Visibility};
use crate::model::{Entity, Record};
use std::collections::BTreeMap;

/// Read side of the entity store.
pub trait EntityReader {
    /// Fetch one record. Soft-removed rows are only returned with
    /// `Visibility::IncludeRemoved`; otherwise they are reported as not found.
    fn find(&self, kind: EntityKind, id: RecordId, visibility: Visibility) -> Result<Entity>;

    fn scan(&self, kind: EntityKind, visibility: Visibility) -> Result<Vec<Entity>>;

    /// Grouped aggregate: number of `kind` rows per value of the foreign key
    /// `parent_field`.
    fn count_by_parent(
        &self,
        kind: EntityKind,
        parent_field: Field,
        visibility: Visibility,
    ) -> Result<BTreeMap<RecordId, u64>>;

    fn find_by_id<R: Record>(&self, id: RecordId, visibility: Visibility) -> Result<R>
    where
        Self: Sized,
    {
        self.find(R::KIND, id, visibility)?.into_record()
    }

    fn scan_records<R: Record>(&self, visibility: Visibility) -> Result<Vec<R>>
    where
        Self: Sized,
    {
        self.scan(R::KIND, visibility)?
            .into_iter()
            .map(Entity::into_record)
            .collect()
    }
}

/// Write side of the entity store. Every write happens inside a transaction.
///
/// Crate-private: outside callers write through the operations on `Tx`, which
/// fire the lifecycle hooks for every post and comment write.
pub(crate) trait EntityStore: EntityReader {
    /// Store a new record; the returned copy carries the assigned id.
    fn insert(&mut self, entity: Entity) -> Result<Entity>;

    /// Apply a conditional multi-field update to one live row.
    ///
    /// Returns the number of affected rows: 0 when the row is missing, removed,
    /// or the guard does not hold.
    fn update_fields(&mut self, kind: EntityKind, id: RecordId, update: &FieldUpdate) -> Result<usize>;

    /// Set the removal marker on a live row and return the removed row, whose
    /// references are still readable.
    fn soft_remove(&mut self, kind: EntityKind, id: RecordId) -> Result<Entity>;

    /// Soft-remove every live `kind` row whose `parent_field` equals
    /// `parent_id`. No lifecycle hooks run for these rows.
    fn bulk_soft_remove_by_parent(
        &mut self,
        kind: EntityKind,
        parent_field: Field,
        parent_id: RecordId,
    ) -> Result<usize>;

    fn create<R: Record>(&mut self, record: R) -> Result<R>
    where
        Self: Sized,
    {
        self.insert(record.into_entity())?.into_record()
    }
}
