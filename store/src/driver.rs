//! The storage-driver contract.

use keel_core::{Attributes, Entity, EntityId};

use crate::error::StoreResult;
use crate::query::{Condition, Query};

/// Synchronous, transactional storage driver.
///
/// Every call blocks the handling thread until the backend answers. The
/// persist layer brackets its work in `begin`/`commit` and relies on
/// `rollback` undoing every write issued since `begin`, including pivot rows.
pub trait Store {
    // ========== Transaction Lifecycle ==========

    /// Begin a transaction.
    fn begin(&mut self) -> StoreResult<()>;

    /// Commit the active transaction.
    fn commit(&mut self) -> StoreResult<()>;

    /// Roll back every write made since `begin`.
    fn rollback(&mut self) -> StoreResult<()>;

    /// Check if a transaction is active.
    fn in_transaction(&self) -> bool;

    // ========== Entities ==========

    /// Returns true if the driver knows the entity type.
    fn has_entity_type(&self, entity_type: &str) -> bool;

    /// Load an entity by identifier.
    fn load(&self, entity_type: &str, id: EntityId) -> StoreResult<Option<Entity>>;

    /// Insert (no id yet) or update (id present) an entity.
    ///
    /// On success the entity carries its identifier and its original
    /// snapshot equals its current attributes.
    fn save(&mut self, entity: &mut Entity) -> StoreResult<EntityId>;

    /// Delete an entity. Returns false if it did not exist.
    fn delete(&mut self, entity_type: &str, id: EntityId) -> StoreResult<bool>;

    /// Run a query, ordered by identifier.
    fn select(&self, query: &Query) -> StoreResult<Vec<Entity>>;

    /// Count the query's matches, ignoring its window.
    fn count(&self, query: &Query) -> StoreResult<usize>;

    // ========== Pivot Tables ==========

    /// Returns true if the driver knows the pivot table.
    fn has_pivot_table(&self, table: &str) -> bool;

    /// Rows matching every condition, in insertion order.
    fn pivot_select(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Attributes>>;

    /// Insert a row.
    fn pivot_insert(&mut self, table: &str, row: Attributes) -> StoreResult<()>;

    /// Merge `values` into every matching row. Returns the number of rows touched.
    fn pivot_update(
        &mut self,
        table: &str,
        conditions: &[Condition],
        values: &Attributes,
    ) -> StoreResult<usize>;

    /// Delete every matching row. Returns the number of rows removed.
    fn pivot_delete(&mut self, table: &str, conditions: &[Condition]) -> StoreResult<usize>;
}
