//! Keel Persist
//!
//! Transactional operations over resources.
//!
//! Responsibilities:
//! - Create and update entities through the persist state machine
//!   (authorize, validate, fill, save, sync, log, commit)
//! - Serve attachment endpoints (attachable listing, attach, detach, sync)
//!   inside a transaction, answering with an `Envelope`
//! - Roll back every write of a failed operation and record the failure

mod error;
mod handler;
mod operation;
mod txn;

pub use error::{PersistError, PersistResult};
pub use handler::{AttachmentHandler, Target};
pub use operation::{PersistOperation, PersistState};
