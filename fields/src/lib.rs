//! Keel Fields
//!
//! Field descriptors and the resources that group them.
//!
//! Responsibilities:
//! - Describe scalar and relation fields (`Field`, `FieldKind`, `RelationKind`)
//! - Resolve field values for display and fill entities from input
//! - Derive validation rules and run them
//! - Register resources, morph aliases and the per-request cache

mod capability;
mod context;
mod error;
mod field;
mod fieldset;
mod fill;
mod label;
mod metadata;
mod registry;
mod relation;
mod resolve;
mod resource;
mod rules;
mod validator;

pub use capability::{Fillable, Resolvable};
pub use context::{OperationKind, RequestCache, RequestContext, VisibilityContext};
pub use error::{FieldError, FieldResult};
pub use field::{BeforeSaveFn, ComputeFn, DefaultFn, Field, FieldKind, ScalarType, Visibility};
pub use fieldset::FieldSet;
pub use fill::cast;
pub use label::resolve_label;
pub use metadata::RelationMetadata;
pub use registry::{MorphMap, ResourceRegistry, ResourceRegistryBuilder};
pub use relation::{DisplayFn, PivotTable, RelationField, RelationKind};
pub use resolve::{filter_pivot, Collection, RelatedItem, Resolved};
pub use resource::{Ability, AllowAll, Gate, Resource};
pub use rules::{attribute_label, Rule};
pub use validator::{ValidationErrors, Validator};
