//! Transaction buffer for tracking writes that rollback must undo.

use keel_core::{Attributes, EntityId};

/// One write applied during a transaction, with what is needed to reverse it.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// An entity was inserted.
    Inserted { entity_type: String, id: EntityId },
    /// An entity was updated; `previous` holds its attributes before the write.
    Updated {
        entity_type: String,
        id: EntityId,
        previous: Attributes,
    },
    /// An entity was deleted.
    Deleted {
        entity_type: String,
        id: EntityId,
        attributes: Attributes,
    },
    /// A pivot row was inserted.
    PivotInserted { table: String, row_id: u64 },
    /// A pivot row was updated.
    PivotUpdated {
        table: String,
        row_id: u64,
        previous: Attributes,
    },
    /// A pivot row was deleted.
    PivotDeleted {
        table: String,
        row_id: u64,
        row: Attributes,
    },
}

/// Transaction buffer that tracks uncommitted writes in application order.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuffer {
    records: Vec<UndoRecord>,
}

impl TransactionBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an entity insert.
    pub fn track_inserted(&mut self, entity_type: &str, id: EntityId) {
        self.records.push(UndoRecord::Inserted {
            entity_type: entity_type.to_string(),
            id,
        });
    }

    /// Track an entity update.
    pub fn track_updated(&mut self, entity_type: &str, id: EntityId, previous: Attributes) {
        self.records.push(UndoRecord::Updated {
            entity_type: entity_type.to_string(),
            id,
            previous,
        });
    }

    /// Track an entity deletion.
    pub fn track_deleted(&mut self, entity_type: &str, id: EntityId, attributes: Attributes) {
        self.records.push(UndoRecord::Deleted {
            entity_type: entity_type.to_string(),
            id,
            attributes,
        });
    }

    /// Track a pivot row insert.
    pub fn track_pivot_inserted(&mut self, table: &str, row_id: u64) {
        self.records.push(UndoRecord::PivotInserted {
            table: table.to_string(),
            row_id,
        });
    }

    /// Track a pivot row update.
    pub fn track_pivot_updated(&mut self, table: &str, row_id: u64, previous: Attributes) {
        self.records.push(UndoRecord::PivotUpdated {
            table: table.to_string(),
            row_id,
            previous,
        });
    }

    /// Track a pivot row deletion.
    pub fn track_pivot_deleted(&mut self, table: &str, row_id: u64, row: Attributes) {
        self.records.push(UndoRecord::PivotDeleted {
            table: table.to_string(),
            row_id,
            row,
        });
    }

    /// Number of tracked writes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take the records newest-first, leaving the buffer empty.
    pub fn drain_for_undo(&mut self) -> impl Iterator<Item = UndoRecord> {
        let mut records = std::mem::take(&mut self.records);
        records.reverse();
        records.into_iter()
    }

    /// Clear the buffer (on commit).
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
