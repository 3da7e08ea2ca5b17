//! Keel Store
//!
//! The storage-driver boundary the field engine persists through.
//!
//! Responsibilities:
//! - Define the synchronous `Store` contract (load/save/delete, queries, pivot rows)
//! - Provide BEGIN/COMMIT/ROLLBACK semantics to the persist layer
//! - Ship `MemoryStore`, a reference driver that applies writes directly and
//!   undoes them from a transaction buffer on rollback

mod buffer;
mod driver;
mod error;
mod memory;
mod query;

pub use buffer::{TransactionBuffer, UndoRecord};
pub use driver::Store;
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, TransactionState};
pub use query::{Condition, Query, Search, ID_COLUMN};
