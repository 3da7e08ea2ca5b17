//! In-memory storage driver.
//!
//! This implementation applies writes directly to its tables and tracks
//! them in a buffer for potential rollback. Writes issued outside a
//! transaction are applied immediately and are not tracked (auto-commit).

use std::collections::{BTreeMap, HashMap};

use keel_core::{Attributes, Entity, EntityId};

use crate::buffer::{TransactionBuffer, UndoRecord};
use crate::driver::Store;
use crate::error::{StoreError, StoreResult};
use crate::query::{Condition, Query};

/// Transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction is active.
    Inactive,
    /// Transaction is active.
    Active,
    /// Transaction is being rolled back.
    RollingBack,
}

/// Rows of one entity type.
#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<EntityId, Attributes>,
    next_id: u64,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Rows of one pivot table, keyed by an internal row id.
#[derive(Debug, Default)]
struct PivotTable {
    rows: BTreeMap<u64, Attributes>,
    next_row_id: u64,
}

impl PivotTable {
    fn matching(&self, conditions: &[Condition]) -> Vec<u64> {
        self.rows
            .iter()
            .filter(|(_, row)| conditions.iter().all(|c| c.matches_row(row)))
            .map(|(row_id, _)| *row_id)
            .collect()
    }
}

/// Reference storage driver backed by ordered maps.
#[derive(Debug)]
pub struct MemoryStore {
    tables: HashMap<String, Table>,
    pivots: HashMap<String, PivotTable>,
    state: TransactionState,
    buffer: TransactionBuffer,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store with no tables.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            pivots: HashMap::new(),
            state: TransactionState::Inactive,
            buffer: TransactionBuffer::new(),
        }
    }

    /// Register an entity table.
    pub fn define_table(&mut self, entity_type: impl Into<String>) -> &mut Self {
        self.tables.entry(entity_type.into()).or_insert_with(Table::new);
        self
    }

    /// Register a pivot table.
    pub fn define_pivot(&mut self, table: impl Into<String>) -> &mut Self {
        self.pivots.entry(table.into()).or_default();
        self
    }

    /// Insert a row outside any transaction and return it as stored.
    ///
    /// Intended for seeding fixtures.
    pub fn seed(&mut self, entity_type: &str, attributes: Attributes) -> StoreResult<Entity> {
        let mut entity = Entity::new(entity_type).with_attributes(attributes);
        self.save(&mut entity)?;
        Ok(entity)
    }

    /// All rows of an entity type, ordered by identifier.
    pub fn all(&self, entity_type: &str) -> Vec<Entity> {
        self.tables
            .get(entity_type)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .map(|(id, attrs)| Entity::stored(entity_type, *id, attrs.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All rows of a pivot table, in insertion order.
    pub fn pivot_rows(&self, table: &str) -> Vec<Attributes> {
        self.pivots
            .get(table)
            .map(|pivot| pivot.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the current transaction state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of writes the active transaction would undo.
    pub fn pending_writes(&self) -> usize {
        self.buffer.len()
    }

    // ========== Internal Helpers ==========

    fn tracking(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn table(&self, entity_type: &str) -> StoreResult<&Table> {
        self.tables
            .get(entity_type)
            .ok_or_else(|| StoreError::unknown_table(entity_type))
    }

    fn table_mut(&mut self, entity_type: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(entity_type)
            .ok_or_else(|| StoreError::unknown_table(entity_type))
    }

    fn pivot(&self, table: &str) -> StoreResult<&PivotTable> {
        self.pivots
            .get(table)
            .ok_or_else(|| StoreError::unknown_table(table))
    }

    fn pivot_mut(&mut self, table: &str) -> StoreResult<&mut PivotTable> {
        self.pivots
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))
    }

    fn undo(&mut self, record: UndoRecord) {
        match record {
            UndoRecord::Inserted { entity_type, id } => {
                if let Some(table) = self.tables.get_mut(&entity_type) {
                    table.rows.remove(&id);
                }
            }
            UndoRecord::Updated {
                entity_type,
                id,
                previous,
            }
            | UndoRecord::Deleted {
                entity_type,
                id,
                attributes: previous,
            } => {
                if let Some(table) = self.tables.get_mut(&entity_type) {
                    table.rows.insert(id, previous);
                }
            }
            UndoRecord::PivotInserted { table, row_id } => {
                if let Some(pivot) = self.pivots.get_mut(&table) {
                    pivot.rows.remove(&row_id);
                }
            }
            UndoRecord::PivotUpdated {
                table,
                row_id,
                previous: row,
            }
            | UndoRecord::PivotDeleted { table, row_id, row } => {
                if let Some(pivot) = self.pivots.get_mut(&table) {
                    pivot.rows.insert(row_id, row);
                }
            }
        }
    }
}

impl Store for MemoryStore {
    // ========== Transaction Lifecycle ==========

    fn begin(&mut self) -> StoreResult<()> {
        if self.state == TransactionState::Active {
            return Err(StoreError::AlreadyActive);
        }

        self.buffer = TransactionBuffer::new();
        self.state = TransactionState::Active;
        tracing::debug!("memory store transaction begun");

        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.state != TransactionState::Active {
            return Err(StoreError::NoActiveTransaction);
        }

        // Changes are already applied to the tables
        let writes = self.buffer.len();
        self.buffer.clear();
        self.state = TransactionState::Inactive;
        tracing::debug!(writes, "memory store transaction committed");

        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if self.state != TransactionState::Active {
            return Err(StoreError::NoActiveTransaction);
        }

        self.state = TransactionState::RollingBack;
        let records: Vec<UndoRecord> = self.buffer.drain_for_undo().collect();
        let undone = records.len();
        for record in records {
            self.undo(record);
        }
        self.state = TransactionState::Inactive;
        tracing::debug!(undone, "memory store transaction rolled back");

        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state == TransactionState::Active
    }

    // ========== Entities ==========

    fn has_entity_type(&self, entity_type: &str) -> bool {
        self.tables.contains_key(entity_type)
    }

    fn load(&self, entity_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        let table = self.table(entity_type)?;
        Ok(table
            .rows
            .get(&id)
            .map(|attrs| Entity::stored(entity_type, id, attrs.clone())))
    }

    fn save(&mut self, entity: &mut Entity) -> StoreResult<EntityId> {
        let tracking = self.tracking();
        let entity_type = entity.entity_type.clone();
        let table = self.table_mut(&entity_type)?;

        let (id, previous) = match entity.id {
            Some(id) => {
                let row = table
                    .rows
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found(&entity_type, id))?;
                let previous = std::mem::replace(row, entity.attributes.clone());
                (id, Some(previous))
            }
            None => {
                let id = table.alloc_id();
                table.rows.insert(id, entity.attributes.clone());
                (id, None)
            }
        };

        if tracking {
            match previous {
                Some(previous) => self.buffer.track_updated(&entity_type, id, previous),
                None => self.buffer.track_inserted(&entity_type, id),
            }
        }

        entity.id = Some(id);
        entity.sync_original();
        Ok(id)
    }

    fn delete(&mut self, entity_type: &str, id: EntityId) -> StoreResult<bool> {
        let tracking = self.tracking();
        let removed = self.table_mut(entity_type)?.rows.remove(&id);
        match removed {
            Some(attributes) => {
                if tracking {
                    self.buffer.track_deleted(entity_type, id, attributes);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn select(&self, query: &Query) -> StoreResult<Vec<Entity>> {
        let table = self.table(&query.entity_type)?;
        let matches = table
            .rows
            .iter()
            .map(|(id, attrs)| Entity::stored(&query.entity_type, *id, attrs.clone()))
            .filter(|entity| query.matches(entity))
            .skip(query.offset);

        Ok(match query.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }

    fn count(&self, query: &Query) -> StoreResult<usize> {
        Ok(self.select(&query.unbounded())?.len())
    }

    // ========== Pivot Tables ==========

    fn has_pivot_table(&self, table: &str) -> bool {
        self.pivots.contains_key(table)
    }

    fn pivot_select(&self, table: &str, conditions: &[Condition]) -> StoreResult<Vec<Attributes>> {
        let pivot = self.pivot(table)?;
        Ok(pivot
            .matching(conditions)
            .into_iter()
            .filter_map(|row_id| pivot.rows.get(&row_id).cloned())
            .collect())
    }

    fn pivot_insert(&mut self, table: &str, row: Attributes) -> StoreResult<()> {
        let tracking = self.tracking();
        let pivot = self.pivot_mut(table)?;
        pivot.next_row_id += 1;
        let row_id = pivot.next_row_id;
        pivot.rows.insert(row_id, row);

        if tracking {
            self.buffer.track_pivot_inserted(table, row_id);
        }
        Ok(())
    }

    fn pivot_update(
        &mut self,
        table: &str,
        conditions: &[Condition],
        values: &Attributes,
    ) -> StoreResult<usize> {
        let tracking = self.tracking();
        let pivot = self.pivot_mut(table)?;
        let row_ids = pivot.matching(conditions);

        let mut previous_rows = Vec::with_capacity(row_ids.len());
        for row_id in &row_ids {
            if let Some(row) = pivot.rows.get_mut(row_id) {
                previous_rows.push((*row_id, row.clone()));
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
            }
        }

        if tracking {
            for (row_id, previous) in previous_rows {
                self.buffer.track_pivot_updated(table, row_id, previous);
            }
        }
        Ok(row_ids.len())
    }

    fn pivot_delete(&mut self, table: &str, conditions: &[Condition]) -> StoreResult<usize> {
        let tracking = self.tracking();
        let pivot = self.pivot_mut(table)?;
        let row_ids = pivot.matching(conditions);

        let removed: Vec<(u64, Attributes)> = row_ids
            .iter()
            .filter_map(|row_id| pivot.rows.remove(row_id).map(|row| (*row_id, row)))
            .collect();
        let count = removed.len();

        if tracking {
            for (row_id, row) in removed {
                self.buffer.track_pivot_deleted(table, row_id, row);
            }
        }
        Ok(count)
    }
}
