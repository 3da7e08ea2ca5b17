//! Request-scoped context.
//!
//! A `RequestContext` is created at request entry and dropped once the
//! response is built. It carries who is acting, what they submitted and a
//! cache that lives exactly as long as the request.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use keel_core::{Attributes, Entity, EntityId, Value};
use keel_store::{Store, StoreResult};
use serde::{Deserialize, Serialize};

use crate::fieldset::FieldSet;

/// The four contexts a field can be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityContext {
    Index,
    Detail,
    Create,
    Update,
}

/// Kind of persist operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
}

impl OperationKind {
    /// The visibility context whose fields take part in this operation.
    pub fn visibility(self) -> VisibilityContext {
        match self {
            OperationKind::Create => VisibilityContext::Create,
            OperationKind::Update => VisibilityContext::Update,
        }
    }
}

/// Per-request cache for field sets and related-entity loads.
///
/// Nothing here outlives the request, so there is no invalidation beyond
/// `clear`.
#[derive(Debug, Default)]
pub struct RequestCache {
    field_sets: RefCell<HashMap<String, Rc<FieldSet>>>,
    entities: RefCell<HashMap<(String, EntityId), Option<Entity>>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached field set of a resource.
    pub fn field_set(&self, entity_type: &str) -> Option<Rc<FieldSet>> {
        self.field_sets.borrow().get(entity_type).cloned()
    }

    pub fn put_field_set(&self, entity_type: &str, fields: Rc<FieldSet>) {
        self.field_sets
            .borrow_mut()
            .insert(entity_type.to_string(), fields);
    }

    /// Load an entity through the cache. Misses (including "not found") are cached too.
    pub fn load(
        &self,
        store: &dyn Store,
        entity_type: &str,
        id: EntityId,
    ) -> StoreResult<Option<Entity>> {
        let key = (entity_type.to_string(), id);
        if let Some(cached) = self.entities.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let loaded = store.load(entity_type, id)?;
        self.entities.borrow_mut().insert(key, loaded.clone());
        Ok(loaded)
    }

    /// Forget cached entity loads. Field sets are kept.
    pub fn forget_entities(&self) {
        self.entities.borrow_mut().clear();
    }

    pub fn clear(&self) {
        self.field_sets.borrow_mut().clear();
        self.entities.borrow_mut().clear();
    }
}

/// Everything the engine knows about the inbound request.
#[derive(Debug, Default)]
pub struct RequestContext {
    actor_id: Option<EntityId>,
    input: Attributes,
    cache: RequestCache,
}

impl RequestContext {
    pub fn new(input: Attributes) -> Self {
        Self {
            actor_id: None,
            input,
            cache: RequestCache::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: EntityId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn actor_id(&self) -> Option<EntityId> {
        self.actor_id
    }

    pub fn input(&self) -> &Attributes {
        &self.input
    }

    /// Submitted value for a key, or null when absent.
    pub fn input_value(&self, key: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.input.get(key).unwrap_or(&NULL)
    }

    pub fn has_input(&self, key: &str) -> bool {
        self.input.contains_key(key)
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }
}
