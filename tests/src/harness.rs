//! Store, registry, gate and event log wired together for one scenario.

use keel_core::{attrs, Attributes, EngineConfig, Entity, EntityId, Value};
use keel_fields::{AllowAll, Gate, RequestContext, ResourceRegistry};
use keel_journal::MemoryEventLog;
use keel_persist::{AttachmentHandler, PersistOperation, PersistResult, PersistState};
use keel_store::{Condition, MemoryStore, Query, Store};

use crate::error::ScenarioResult;
use crate::fixtures::{registry, registry_with, seeded_store};

/// One scenario's world.
pub struct Harness<S: Store = MemoryStore> {
    pub store: S,
    pub registry: ResourceRegistry,
    pub log: MemoryEventLog,
    gate: Box<dyn Gate>,
}

impl Harness<MemoryStore> {
    /// Seeded memory store, default configuration, everything allowed.
    pub fn new() -> ScenarioResult<Self> {
        Self::with_store(seeded_store()?)
    }
}

impl<S: Store> Harness<S> {
    pub fn with_store(store: S) -> ScenarioResult<Self> {
        Ok(Self {
            store,
            registry: registry()?,
            log: MemoryEventLog::new(),
            gate: Box::new(AllowAll),
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> ScenarioResult<Self> {
        self.registry = registry_with(config)?;
        Ok(self)
    }

    pub fn with_gate(mut self, gate: impl Gate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    // ========== Operations ==========

    /// Create (`id == None`) or update an entity from request input.
    pub fn persist(
        &mut self,
        resource_type: &str,
        id: Option<EntityId>,
        input: Attributes,
    ) -> PersistResult<Entity> {
        self.persist_tracked(resource_type, id, input).0
    }

    /// Like [`Harness::persist`], also returning the state the operation ended in.
    pub fn persist_tracked(
        &mut self,
        resource_type: &str,
        id: Option<EntityId>,
        input: Attributes,
    ) -> (PersistResult<Entity>, PersistState) {
        let ctx = RequestContext::new(input);
        let mut operation =
            PersistOperation::new(&mut self.store, &self.registry, &*self.gate, &self.log);
        let result = operation.handle(&ctx, resource_type, id);
        (result, operation.state())
    }

    pub fn handler(&mut self) -> AttachmentHandler<'_> {
        AttachmentHandler::new(&mut self.store, &self.registry, &*self.gate, &self.log)
    }

    // ========== Fixtures ==========

    /// Insert a post directly, outside any operation.
    pub fn create_post(&mut self, title: &str) -> ScenarioResult<EntityId> {
        let mut post = Entity::new("posts").with_attributes(attrs! { "title" => title });
        Ok(self.store.save(&mut post)?)
    }

    /// Link tags to a post directly, with an optional role per row.
    pub fn link_tags(
        &mut self,
        post: EntityId,
        tags: &[(u64, Option<&str>)],
    ) -> ScenarioResult<()> {
        for (tag, role) in tags {
            let mut row = attrs! { "post_id" => post, "tag_id" => EntityId::new(*tag) };
            if let Some(role) = role {
                row.insert("role".to_string(), Value::from(*role));
            }
            self.store.pivot_insert("post_tag", row)?;
        }
        Ok(())
    }

    // ========== Inspection ==========

    pub fn load(&self, entity_type: &str, id: EntityId) -> Option<Entity> {
        self.store.load(entity_type, id).ok().flatten()
    }

    pub fn count(&self, entity_type: &str) -> usize {
        self.store.count(&Query::new(entity_type)).unwrap_or(0)
    }

    /// Pivot rows for one post, in insertion order.
    pub fn post_tag_rows(&self, post: EntityId) -> Vec<Attributes> {
        self.store
            .pivot_select("post_tag", &[Condition::eq("post_id", post)])
            .unwrap_or_default()
    }

    /// Tag ids attached to a post, sorted.
    pub fn tag_ids(&self, post: EntityId) -> Vec<EntityId> {
        let mut tags: Vec<EntityId> = self
            .post_tag_rows(post)
            .iter()
            .filter_map(|row| row.get("tag_id").and_then(EntityId::from_value))
            .collect();
        tags.sort();
        tags
    }
}

/// Entity ids from raw numbers.
pub fn ids(raw: &[u64]) -> Vec<EntityId> {
    raw.iter().copied().map(EntityId::new).collect()
}
