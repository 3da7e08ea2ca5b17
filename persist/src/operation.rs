//! The persist operation: create or update one entity from request input.

use std::fmt;

use keel_core::{Attributes, Entity, EntityId, Value};
use keel_fields::{
    Ability, Field, Fillable, Gate, OperationKind, RequestContext, ResourceRegistry, Rule,
    ValidationErrors, Validator,
};
use keel_journal::{diff, ActionEvent, ActionKind, BatchId, EventSink, Redactor};
use keel_relation::{AfterSaveable, ChangeSet};
use keel_store::Store;

use crate::error::{PersistError, PersistResult, StepError};
use crate::txn::in_transaction;

/// Persist operation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistState {
    Initialized,
    Authorized,
    Validated,
    Filled,
    Saved,
    Synced,
    Logged,
    Completed,
    /// Terminal; reachable from every non-terminal state.
    Failed,
}

impl PersistState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PersistState::Completed | PersistState::Failed)
    }
}

impl fmt::Display for PersistState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Creates or updates one entity.
///
/// Authorization and validation run before the transaction opens. Fill,
/// save, relation sync and the action log run inside it and succeed or fail
/// together.
pub struct PersistOperation<'a> {
    store: &'a mut dyn Store,
    registry: &'a ResourceRegistry,
    gate: &'a dyn Gate,
    sink: &'a dyn EventSink,
    batch_id: BatchId,
    state: PersistState,
    synced: Vec<(String, ChangeSet)>,
}

impl<'a> PersistOperation<'a> {
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
            state: PersistState::Initialized,
            synced: Vec::new(),
        }
    }

    /// Group this operation's events with others of the same request.
    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn state(&self) -> PersistState {
        self.state
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Relation changes written by the after-save step, by field key.
    pub fn synced(&self) -> &[(String, ChangeSet)] {
        &self.synced
    }

    fn transition(&mut self, to: PersistState) {
        tracing::debug!(from = %self.state, to = %to, batch_id = %self.batch_id, "persist state");
        self.state = to;
    }

    fn fail<T>(&mut self, err: PersistError) -> PersistResult<T> {
        self.transition(PersistState::Failed);
        Err(err)
    }

    // ========== Handle ==========

    /// Create (`id` absent) or update (`id` present) an entity of `resource_type`.
    pub fn handle(
        &mut self,
        ctx: &RequestContext,
        resource_type: &str,
        id: Option<EntityId>,
    ) -> PersistResult<Entity> {
        if self.state != PersistState::Initialized {
            return Err(PersistError::persistence(
                self.batch_id.0,
                format!("operation already ran and is {}", self.state),
            ));
        }
        let operation = match id {
            Some(_) => OperationKind::Update,
            None => OperationKind::Create,
        };

        let entity = match self.authorize(ctx, resource_type, id, operation) {
            Ok(entity) => entity,
            Err(e) => return self.fail(e),
        };
        self.transition(PersistState::Authorized);

        let fields = match self.registry.field_set(ctx, resource_type) {
            Ok(fields) => fields,
            Err(e) => return self.fail(e.into()),
        };
        let subset: Vec<&Field> = fields.visible_for(operation.visibility()).collect();

        if let Err(errors) = self.validate(ctx, &subset, operation) {
            tracing::debug!(resource = %resource_type, invalid = errors.len(), "validation failed");
            return self.fail(PersistError::Validation(errors));
        }
        self.transition(PersistState::Validated);

        let result = self.persist(ctx, resource_type, entity, &subset, operation);
        match result {
            Ok(entity) => {
                self.transition(PersistState::Completed);
                tracing::info!(
                    resource = %resource_type,
                    id = ?entity.id,
                    operation = ?operation,
                    "entity persisted"
                );
                Ok(entity)
            }
            Err(e) => self.fail(e),
        }
    }

    fn authorize(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
        id: Option<EntityId>,
        operation: OperationKind,
    ) -> PersistResult<Entity> {
        self.registry.require(resource_type)?;
        let (entity, ability) = match id {
            Some(id) => {
                let entity = self
                    .store
                    .load(resource_type, id)
                    .map_err(|e| PersistError::persistence(self.batch_id.0, e.to_string()))?
                    .ok_or_else(|| PersistError::not_found(resource_type, id))?;
                (entity, Ability::Update)
            }
            None => (Entity::new(resource_type), Ability::Create),
        };

        if !self.gate.authorized_to(ability, &entity, ctx) {
            tracing::info!(
                resource = %resource_type,
                ability = ?ability,
                operation = ?operation,
                "action not authorized"
            );
            return Err(PersistError::Authorization);
        }
        Ok(entity)
    }

    fn validate(
        &self,
        ctx: &RequestContext,
        subset: &[&Field],
        operation: OperationKind,
    ) -> Result<(), ValidationErrors> {
        let rules: Vec<(String, Vec<Rule>)> = subset
            .iter()
            .filter(|field| field.is_fillable())
            .flat_map(|field| field.validation_rules(operation))
            .collect();
        Validator::new(self.registry, &*self.store).validate(ctx.input(), &rules)
    }

    /// The transactional window: fill, save, sync, commit. Events are
    /// recorded once the commit succeeded.
    fn persist(
        &mut self,
        ctx: &RequestContext,
        resource_type: &str,
        mut entity: Entity,
        subset: &[&Field],
        operation: OperationKind,
    ) -> PersistResult<Entity> {
        let registry = self.registry;
        let sink = self.sink;
        let batch_id = self.batch_id;
        let kind = match operation {
            OperationKind::Create => ActionKind::Create,
            OperationKind::Update => ActionKind::Update,
        };
        let target_id = entity.id;
        let failed = || {
            ActionEvent::new(batch_id, kind, resource_type)
                .actor(ctx.actor_id())
                .target(target_id)
        };

        let mut states = Vec::new();
        let mut synced = Vec::new();
        let result = in_transaction(&mut *self.store, sink, batch_id.0, failed, |store| {
            let original = entity.attributes.clone();
            let resource = registry.require(resource_type)?;

            resource.before_save(&mut entity, ctx)?;
            for field in subset {
                if let Some(hook) = field.before_save_hook() {
                    hook(&mut entity, ctx);
                }
                if !field.defers_to_after_save() {
                    field.fill(ctx, registry, &mut entity);
                }
            }
            states.push(PersistState::Filled);

            store.save(&mut entity)?;
            states.push(PersistState::Saved);

            for field in subset {
                if let Some(changes) = field.after_save(ctx, registry, store, &entity)? {
                    synced.push((field.key().to_string(), changes));
                }
            }
            states.push(PersistState::Synced);

            resource.after_save(&entity, ctx)?;
            let redactor = Redactor::new(&registry.config().journal);
            let (before, after) = diff(&original, &entity.attributes);
            let event = ActionEvent::new(batch_id, kind, resource_type)
                .actor(ctx.actor_id())
                .target(entity.id)
                .snapshots(redactor.redact(before), redactor.redact(after));
            let mut events = vec![event];
            for (key, changes) in &synced {
                events.push(relation_event(batch_id, ctx, &entity, key, changes));
            }
            states.push(PersistState::Logged);

            Ok::<_, StepError>((entity, events))
        });

        for state in states {
            self.transition(state);
        }
        self.synced = synced;
        result
    }
}

/// A `sync` event for relation changes made while persisting.
fn relation_event(
    batch_id: BatchId,
    ctx: &RequestContext,
    entity: &Entity,
    key: &str,
    changes: &ChangeSet,
) -> ActionEvent {
    ActionEvent::new(batch_id, ActionKind::Sync, &entity.entity_type)
        .actor(ctx.actor_id())
        .target(entity.id)
        .relation(key)
        .snapshots(Attributes::new(), change_attributes(changes))
}

/// A change set as event attributes.
pub(crate) fn change_attributes(changes: &ChangeSet) -> Attributes {
    let ids = |ids: &[EntityId]| Value::from(ids.to_vec());
    let mut attributes = Attributes::new();
    attributes.insert("attached".to_string(), ids(&changes.attached));
    attributes.insert("detached".to_string(), ids(&changes.detached));
    attributes.insert("updated".to_string(), ids(&changes.updated));
    attributes
}
