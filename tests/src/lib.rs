//! Keel Integration Test Support
//!
//! Shared fixtures for the scenario tests under `tests/`.
//!
//! # Structure
//!
//! - **fixtures** - A small blog domain: posts, users, tags, comments and videos
//! - **harness** - Store, registry and event log wired together
//! - **failing** - A store wrapper that fails a chosen write on demand
//! - **assertion** - Fluent checks over response envelopes
//!
//! # Example
//!
//! ```ignore
//! use keel_tests::prelude::*;
//!
//! #[test]
//! fn attach_twice() {
//!     let mut harness = Harness::new().unwrap();
//!     let post = harness.create_post("Hello").unwrap();
//!     let ctx = RequestContext::new(Attributes::new());
//!     let envelope = harness.handler().attach(
//!         &ctx,
//!         Target::new("posts", post, "tags"),
//!         &ids(&[1, 2]),
//!         &PivotData::None,
//!     );
//!     EnvelopeAssertion::new().success().verify("attach", &envelope).unwrap();
//! }
//! ```

mod assertion;
mod error;
mod failing;
mod fixtures;
mod harness;

pub use assertion::EnvelopeAssertion;
pub use error::{ScenarioError, ScenarioResult};
pub use failing::{FailPoint, FailingStore};
pub use fixtures::{registry, registry_with, seeded_store, Comments, Posts, Tags, Users, Videos};
pub use harness::Harness;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::assertion::EnvelopeAssertion;
    pub use crate::error::{ScenarioError, ScenarioResult};
    pub use crate::failing::{FailPoint, FailingStore};
    pub use crate::fixtures::{registry, registry_with, seeded_store};
    pub use crate::harness::{ids, Harness};

    pub use keel_core::{attrs, Attributes, EngineConfig, Entity, EntityId, Value};
    pub use keel_fields::{
        Ability, AllowAll, Field, Fillable, Gate, RequestContext, Resolvable, Resolved,
        ResourceRegistry,
    };
    pub use keel_journal::{ActionKind, ActionStatus, MemoryEventLog};
    pub use keel_persist::{PersistError, PersistState, Target};
    pub use keel_relation::{AttachableRequest, ChangeSet, Envelope, PivotData};
    pub use keel_store::{MemoryStore, Store};
}
