//! Keel Journal
//!
//! Action events recorded by persist and attachment operations.
//!
//! Responsibilities:
//! - Describe what an operation did (`ActionEvent`), grouped by batch
//! - Diff entity snapshots and redact sensitive attributes
//! - Deliver events to a sink (memory, JSON-lines file, tracing)

mod diff;
mod error;
mod event;
mod sink;

pub use diff::{diff, Redactor};
pub use error::{JournalError, JournalResult};
pub use event::{ActionEvent, ActionKind, ActionStatus, BatchId};
pub use sink::{EventSink, FileEventLog, MemoryEventLog, TracingEventSink};
