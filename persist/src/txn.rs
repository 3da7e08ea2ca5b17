//! Transaction bracketing shared by persist and attachment operations.

use keel_journal::{ActionEvent, EventSink};
use keel_store::Store;
use uuid::Uuid;

use crate::error::{PersistError, PersistResult, StepError};

/// Run `body` inside a transaction.
///
/// `body` returns its value together with the events describing what it
/// wrote. Those events reach `sink` only once the commit succeeded. On any
/// failure every write since `begin` is rolled back, `failed` is recorded as
/// the only event and the error is mapped for the caller.
pub(crate) fn in_transaction<T>(
    store: &mut dyn Store,
    sink: &dyn EventSink,
    correlation_id: Uuid,
    failed: impl FnOnce() -> ActionEvent,
    body: impl FnOnce(&mut dyn Store) -> Result<(T, Vec<ActionEvent>), StepError>,
) -> PersistResult<T> {
    store
        .begin()
        .map_err(|e| PersistError::persistence(correlation_id, e.to_string()))?;

    let result = body(&mut *store).and_then(|committed| {
        store.commit()?;
        Ok(committed)
    });

    match result {
        Ok((value, events)) => {
            for event in events {
                // Writes are durable at this point; a sink failure cannot undo them.
                if let Err(e) = sink.record(event) {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "failed to record committed action"
                    );
                }
            }
            Ok(value)
        }
        Err(err) => {
            if store.in_transaction() {
                if let Err(e) = store.rollback() {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "rollback failed"
                    );
                }
            }
            tracing::error!(
                correlation_id = %correlation_id,
                error = %err,
                "operation rolled back"
            );
            if let Err(e) = sink.record(failed().failed(err.to_string())) {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "failed to record failed action"
                );
            }
            Err(err.into_persist(correlation_id))
        }
    }
}
