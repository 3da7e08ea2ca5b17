//! Capabilities every field offers to the rest of the engine.
//!
//! Listing, export and persistence only talk to fields through these
//! traits plus `Field::validation_rules` and `Field::is_visible_for`.

use keel_core::Entity;
use keel_store::Store;

use crate::context::RequestContext;
use crate::registry::ResourceRegistry;
use crate::resolve::Resolved;

/// Reads a field's value for display.
pub trait Resolvable {
    /// Never mutates the entity and never fails: absent data resolves to
    /// null or an empty collection.
    fn resolve(
        &self,
        ctx: &RequestContext,
        registry: &ResourceRegistry,
        store: &dyn Store,
        entity: &Entity,
    ) -> Resolved;
}

/// Writes submitted input onto an entity.
pub trait Fillable {
    /// No-op for readonly, disabled and computed fields, for relations owned
    /// by the related side, and for relations deferred to after-save.
    fn fill(&self, ctx: &RequestContext, registry: &ResourceRegistry, entity: &mut Entity);
}
