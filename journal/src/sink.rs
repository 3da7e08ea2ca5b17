//! Event sinks.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{JournalError, JournalResult};
use crate::event::{ActionEvent, ActionStatus};

/// Receives action events.
pub trait EventSink {
    fn record(&self, event: ActionEvent) -> JournalResult<()>;
}

/// In-memory event log for testing and simple use cases.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<ActionEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> JournalResult<MutexGuard<'_, Vec<ActionEvent>>> {
        self.events
            .lock()
            .map_err(|e| JournalError::unavailable(e.to_string()))
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn events(&self) -> Vec<ActionEvent> {
        self.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent event.
    pub fn last(&self) -> Option<ActionEvent> {
        self.lock().ok().and_then(|events| events.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: ActionEvent) -> JournalResult<()> {
        self.lock()?.push(event);
        Ok(())
    }
}

/// Appends events to a file, one JSON document per line.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileEventLog {
    /// Open or create a log file for appending.
    pub fn open(path: impl AsRef<Path>) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Read back every event in the file.
    pub fn read_all(path: impl AsRef<Path>) -> JournalResult<Vec<ActionEvent>> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line)
                .map_err(|e| JournalError::invalid_entry(index + 1, e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileEventLog {
    fn record(&self, event: ActionEvent) -> JournalResult<()> {
        let line = serde_json::to_string(&event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| JournalError::unavailable(e.to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Emits events as structured log records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: ActionEvent) -> JournalResult<()> {
        let target_id = event.target_id.map(|id| id.to_string()).unwrap_or_default();
        match event.status {
            ActionStatus::Finished => tracing::info!(
                event_id = %event.id,
                batch_id = %event.batch_id,
                kind = %event.kind,
                target_type = %event.target_type,
                target_id = %target_id,
                relation = event.relation.as_deref().unwrap_or(""),
                changed = event.changes.len(),
                "action finished"
            ),
            ActionStatus::Failed => tracing::warn!(
                event_id = %event.id,
                batch_id = %event.batch_id,
                kind = %event.kind,
                target_type = %event.target_type,
                target_id = %target_id,
                exception = event.exception.as_deref().unwrap_or(""),
                "action failed"
            ),
        }
        Ok(())
    }
}
