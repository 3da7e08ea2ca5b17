//! Deferred relation writes that need the entity's identifier.

use keel_core::{Entity, EntityId};
use keel_fields::{Field, RequestContext, ResourceRegistry};
use keel_store::Store;

use crate::attachment::Attachment;
use crate::error::RelationResult;
use crate::outcome::ChangeSet;
use crate::pivot_data::PivotData;

/// A field whose input is written after the entity has been saved.
pub trait AfterSaveable {
    /// Write the field's input for `entity`.
    ///
    /// Returns `None` when the field has nothing to write: it does not
    /// defer, it is not fillable, or its key is absent from the input.
    fn after_save(
        &self,
        ctx: &RequestContext,
        registry: &ResourceRegistry,
        store: &mut dyn Store,
        entity: &Entity,
    ) -> RelationResult<Option<ChangeSet>>;
}

impl AfterSaveable for Field {
    fn after_save(
        &self,
        ctx: &RequestContext,
        registry: &ResourceRegistry,
        store: &mut dyn Store,
        entity: &Entity,
    ) -> RelationResult<Option<ChangeSet>> {
        if !self.defers_to_after_save() || !self.is_fillable() || !ctx.has_input(self.key()) {
            return Ok(None);
        }

        let ids = EntityId::list_from_value(ctx.input_value(self.key()));
        let pivot = PivotData::from_value(ctx.input_value(&self.pivot_input_key()));
        let changes =
            Attachment::for_field(self)?.sync(store, registry, entity, &ids, &pivot, true)?;
        Ok(Some(changes))
    }
}
