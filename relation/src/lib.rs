//! Keel Relation
//!
//! Attachment services for relation fields.
//!
//! Responsibilities:
//! - List related entities that can still be attached to a parent
//! - Attach and detach related entities, honouring attachment limits
//! - Sync pivot relations to a target membership and report the `ChangeSet`
//! - Run the deferred after-save write of pivot relation fields

mod after_save;
mod attachment;
mod envelope;
mod error;
mod outcome;
mod owned;
mod pivot;
mod pivot_data;

pub use after_save::AfterSaveable;
pub use attachment::{Attachment, Syncable};
pub use envelope::Envelope;
pub use error::{RelationError, RelationResult};
pub use outcome::{AttachOutcome, AttachableItem, AttachableRequest, ChangeSet, DetachOutcome, Page};
pub use owned::{Link, OwnedAttachment};
pub use pivot::PivotAttachment;
pub use pivot_data::PivotData;
