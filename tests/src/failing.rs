//! A store wrapper that fails one kind of write on demand.

use keel_core::{Attributes, Entity, EntityId};
use keel_store::{Condition, MemoryStore, Query, Store, StoreError, StoreResult};

/// Which write fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailPoint {
    /// Saving an entity of this type.
    Save(String),
    /// Inserting into this pivot table.
    PivotInsert(String),
    /// Deleting from this pivot table.
    PivotDelete(String),
    Commit,
}

/// Delegates to a [`MemoryStore`] and fails the configured write.
///
/// Only writes inside a transaction fail, so fixtures can still be seeded
/// through the wrapper.
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_at: FailPoint,
    failures: usize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, fail_at: FailPoint) -> Self {
        Self {
            inner,
            fail_at,
            failures: 0,
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// How many writes were refused.
    pub fn failures(&self) -> usize {
        self.failures
    }

    fn check(&mut self, point: FailPoint) -> StoreResult<()> {
        if self.inner.in_transaction() && point == self.fail_at {
            self.failures += 1;
            tracing::debug!(?point, "injecting store failure");
            return Err(StoreError::backend(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

impl Store for FailingStore {
    fn begin(&mut self) -> StoreResult<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.check(FailPoint::Commit)?;
        self.inner.commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn has_entity_type(&self, entity_type: &str) -> bool {
        self.inner.has_entity_type(entity_type)
    }

    fn load(&self, entity_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        self.inner.load(entity_type, id)
    }

    fn save(&mut self, entity: &mut Entity) -> StoreResult<EntityId> {
        self.check(FailPoint::Save(entity.entity_type.clone()))?;
        self.inner.save(entity)
    }

    fn delete(&mut self, entity_type: &str, id: EntityId) -> StoreResult<bool> {
        self.inner.delete(entity_type, id)
    }

    fn select(&self, query: &Query) -> StoreResult<Vec<Entity>> {
        self.inner.select(query)
    }

    fn count(&self, query: &Query) -> StoreResult<usize> {
        self.inner.count(query)
    }

    fn has_pivot_table(&self, table: &str) -> bool {
        self.inner.has_pivot_table(table)
    }

    fn pivot_select(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Attributes>> {
        self.inner.pivot_select(table, conditions)
    }

    fn pivot_insert(&mut self, table: &str, row: Attributes) -> StoreResult<()> {
        self.check(FailPoint::PivotInsert(table.to_string()))?;
        self.inner.pivot_insert(table, row)
    }

    fn pivot_update(
        &mut self,
        table: &str,
        conditions: &[Condition],
        values: &Attributes,
    ) -> StoreResult<usize> {
        self.inner.pivot_update(table, conditions, values)
    }

    fn pivot_delete(&mut self, table: &str, conditions: &[Condition]) -> StoreResult<usize> {
        self.check(FailPoint::PivotDelete(table.to_string()))?;
        self.inner.pivot_delete(table, conditions)
    }
}
