//! Attachment endpoints: one relation of one parent per call.

use keel_core::{Attributes, Entity, EntityId, Value};
use keel_fields::{Ability, Field, Gate, RequestContext, ResourceRegistry};
use keel_journal::{ActionEvent, ActionKind, BatchId, EventSink};
use keel_relation::{
    AttachOutcome, AttachableRequest, Attachment, ChangeSet, DetachOutcome, Envelope, Page,
    PivotData,
};
use keel_store::Store;

use crate::error::{PersistError, PersistResult, StepError};
use crate::operation::change_attributes;
use crate::txn::in_transaction;

/// Transactional attach, detach and sync with structured envelopes.
pub struct AttachmentHandler<'a> {
    store: &'a mut dyn Store,
    registry: &'a ResourceRegistry,
    gate: &'a dyn Gate,
    sink: &'a dyn EventSink,
    batch_id: BatchId,
}

/// What one endpoint call targets.
#[derive(Debug, Clone, Copy)]
pub struct Target<'t> {
    pub resource_type: &'t str,
    pub id: EntityId,
    pub relation: &'t str,
}

impl<'t> Target<'t> {
    pub fn new(resource_type: &'t str, id: EntityId, relation: &'t str) -> Self {
        Self {
            resource_type,
            id,
            relation,
        }
    }
}

impl<'a> AttachmentHandler<'a> {
    pub fn new(
        store: &'a mut dyn Store,
        registry: &'a ResourceRegistry,
        gate: &'a dyn Gate,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            store,
            registry,
            gate,
            sink,
            batch_id: BatchId::new(),
        }
    }

    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = batch_id;
        self
    }

    // ========== Endpoints ==========

    pub fn attachable(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        request: &AttachableRequest,
    ) -> Envelope {
        respond(self.list(ctx, target, request), |page: &Page| {
            format!("{} attachable {}.", page.total, records(page.total))
        })
    }

    pub fn attach(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
    ) -> Envelope {
        respond(self.try_attach(ctx, target, ids, pivot), |outcome: &AttachOutcome| {
            format!("Attached {} {}.", outcome.attached.len(), records(outcome.attached.len()))
        })
    }

    pub fn detach(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
    ) -> Envelope {
        respond(self.try_detach(ctx, target, ids), |outcome: &DetachOutcome| {
            format!("Detached {} {}.", outcome.detached, records(outcome.detached))
        })
    }

    pub fn sync(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
        detaching: bool,
    ) -> Envelope {
        respond(
            self.try_sync(ctx, target, ids, pivot, detaching),
            |changes: &ChangeSet| {
                format!(
                    "Synced: {} attached, {} detached, {} updated.",
                    changes.attached.len(),
                    changes.detached.len(),
                    changes.updated.len()
                )
            },
        )
    }

    // ========== Typed Operations ==========

    pub fn list(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        request: &AttachableRequest,
    ) -> PersistResult<Page> {
        let (parent, field) = self.prepare(ctx, target, &[Ability::View])?;
        let attachment = Attachment::for_field(&field)?;
        Ok(attachment.list_attachable(&*self.store, self.registry, &parent, request)?)
    }

    pub fn try_attach(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
    ) -> PersistResult<AttachOutcome> {
        let (parent, field) = self.prepare(ctx, target, &[Ability::Attach])?;
        let attachment = Attachment::for_field(&field)?;
        let registry = self.registry;
        self.transact(ctx, ActionKind::Attach, &parent, target.relation, |store| {
            let outcome = attachment.attach(store, registry, &parent, ids, pivot)?;
            let changes = ChangeSet {
                attached: outcome.attached.clone(),
                ..ChangeSet::default()
            };
            Ok((outcome, changes))
        })
    }

    pub fn try_detach(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
    ) -> PersistResult<DetachOutcome> {
        let (parent, field) = self.prepare(ctx, target, &[Ability::Detach])?;
        let attachment = Attachment::for_field(&field)?;
        let registry = self.registry;
        self.transact(ctx, ActionKind::Detach, &parent, target.relation, |store| {
            let outcome = attachment.detach(store, registry, &parent, ids)?;
            let changes = ChangeSet {
                detached: outcome.ids.clone(),
                ..ChangeSet::default()
            };
            Ok((outcome, changes))
        })
    }

    pub fn try_sync(
        &mut self,
        ctx: &RequestContext,
        target: Target<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
        detaching: bool,
    ) -> PersistResult<ChangeSet> {
        let abilities: &[Ability] = if detaching {
            &[Ability::Attach, Ability::Detach]
        } else {
            &[Ability::Attach]
        };
        let (parent, field) = self.prepare(ctx, target, abilities)?;
        let attachment = Attachment::for_field(&field)?;
        let registry = self.registry;
        self.transact(ctx, ActionKind::Sync, &parent, target.relation, |store| {
            let changes = attachment.sync(store, registry, &parent, ids, pivot, detaching)?;
            Ok((changes.clone(), changes))
        })
    }

    // ========== Helpers ==========

    /// Load the parent, look up the relation field and authorize.
    fn prepare(
        &self,
        ctx: &RequestContext,
        target: Target<'_>,
        abilities: &[Ability],
    ) -> PersistResult<(Entity, Field)> {
        self.registry.require(target.resource_type)?;
        let parent = self
            .store
            .load(target.resource_type, target.id)
            .map_err(|e| PersistError::persistence(self.batch_id.0, e.to_string()))?
            .ok_or_else(|| PersistError::not_found(target.resource_type, target.id))?;

        if let Some(ability) = abilities
            .iter()
            .find(|ability| !self.gate.authorized_to(**ability, &parent, ctx))
        {
            tracing::info!(
                resource = %target.resource_type,
                relation = %target.relation,
                ability = ?ability,
                "attachment not authorized"
            );
            return Err(PersistError::Authorization);
        }

        let field = self
            .registry
            .find_field(ctx, target.resource_type, target.relation)?;
        Ok((parent, field))
    }

    fn transact<T>(
        &mut self,
        ctx: &RequestContext,
        kind: ActionKind,
        parent: &Entity,
        relation: &str,
        body: impl FnOnce(&mut dyn Store) -> Result<(T, ChangeSet), StepError>,
    ) -> PersistResult<T> {
        let sink = self.sink;
        let batch_id = self.batch_id;
        let event = || {
            ActionEvent::new(batch_id, kind, &parent.entity_type)
                .actor(ctx.actor_id())
                .target(parent.id)
                .relation(relation)
        };
        let base = event();
        in_transaction(&mut *self.store, sink, batch_id.0, event, |store| {
            let (value, changes) = body(store)?;
            Ok((value, vec![base.snapshots(Attributes::new(), changed(&changes))]))
        })
    }
}

/// Drop empty lists so events only carry what moved.
fn changed(changes: &ChangeSet) -> Attributes {
    change_attributes(changes)
        .into_iter()
        .filter(|(_, value)| !matches!(value, Value::List(items) if items.is_empty()))
        .collect()
}

fn records(count: usize) -> &'static str {
    if count == 1 {
        "record"
    } else {
        "records"
    }
}

fn respond<T: serde::Serialize>(
    result: PersistResult<T>,
    message: impl FnOnce(&T) -> String,
) -> Envelope {
    match result {
        Ok(value) => Envelope::ok(message(&value), &value),
        Err(e) => Envelope::error(e.public_message(), e.details()),
    }
}
