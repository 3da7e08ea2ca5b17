//! Resource registry and morph map.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use keel_core::EngineConfig;

use crate::context::RequestContext;
use crate::error::{FieldError, FieldResult};
use crate::field::Field;
use crate::fieldset::FieldSet;
use crate::resource::Resource;

/// Two-way mapping between morph aliases and entity types.
///
/// A type without a registered alias is its own alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphMap {
    alias_to_type: BTreeMap<String, String>,
    type_to_alias: BTreeMap<String, String>,
}

impl MorphMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, alias: String, entity_type: String) -> FieldResult<()> {
        if self.alias_to_type.contains_key(&alias) {
            return Err(FieldError::DuplicateMorphAlias { alias });
        }
        self.type_to_alias.insert(entity_type.clone(), alias.clone());
        self.alias_to_type.insert(alias, entity_type);
        Ok(())
    }

    /// Alias stored in morph type columns for the entity type.
    pub fn alias_for<'a>(&'a self, entity_type: &'a str) -> &'a str {
        self.type_to_alias
            .get(entity_type)
            .map(String::as_str)
            .unwrap_or(entity_type)
    }

    /// Entity type registered under the alias.
    pub fn type_for(&self, alias: &str) -> Option<&str> {
        self.alias_to_type.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.alias_to_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alias_to_type.is_empty()
    }
}

/// Immutable collection of resources.
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Resource>>,
    morph_map: MorphMap,
    config: EngineConfig,
}

impl ResourceRegistry {
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn morph_map(&self) -> &MorphMap {
        &self.morph_map
    }

    pub fn resource(&self, entity_type: &str) -> Option<&Arc<dyn Resource>> {
        self.resources.get(entity_type)
    }

    pub fn require(&self, entity_type: &str) -> FieldResult<&Arc<dyn Resource>> {
        self.resource(entity_type)
            .ok_or_else(|| FieldError::unknown_resource(entity_type))
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Alias for an entity type.
    pub fn morph_alias<'a>(&'a self, entity_type: &'a str) -> &'a str {
        self.morph_map.alias_for(entity_type)
    }

    /// Entity type for an alias: a registered alias, or the name of a
    /// registered resource used as its own alias.
    pub fn resolve_morph_alias(&self, alias: &str) -> Option<&str> {
        self.morph_map.type_for(alias).or_else(|| {
            self.resources
                .get_key_value(alias)
                .map(|(entity_type, _)| entity_type.as_str())
        })
    }

    /// The resource's field set, built once per request.
    pub fn field_set(&self, ctx: &RequestContext, entity_type: &str) -> FieldResult<Rc<FieldSet>> {
        if let Some(cached) = ctx.cache().field_set(entity_type) {
            return Ok(cached);
        }
        let resource = self.require(entity_type)?;
        let fields = Rc::new(FieldSet::new(entity_type, resource.fields(ctx))?);
        ctx.cache().put_field_set(entity_type, Rc::clone(&fields));
        Ok(fields)
    }

    /// Look up a field by (resource, key) through the request cache.
    pub fn find_field(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        key: &str,
    ) -> FieldResult<Field> {
        self.field_set(ctx, entity_type)?
            .get(key)
            .cloned()
            .ok_or_else(|| FieldError::unknown_field(entity_type, key))
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("morph_map", &self.morph_map)
            .finish()
    }
}

/// Builder for constructing an immutable `ResourceRegistry`.
#[derive(Default)]
pub struct ResourceRegistryBuilder {
    resources: Vec<Arc<dyn Resource>>,
    aliases: Vec<(String, String)>,
    config: Option<EngineConfig>,
}

impl ResourceRegistryBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn resource(mut self, resource: impl Resource + 'static) -> Self {
        self.resources.push(Arc::new(resource));
        self
    }

    pub fn shared_resource(mut self, resource: Arc<dyn Resource>) -> Self {
        self.resources.push(resource);
        self
    }

    /// Register `alias` as the morph alias of `entity_type`.
    pub fn morph_alias(mut self, alias: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), entity_type.into()));
        self
    }

    pub fn build(self) -> FieldResult<ResourceRegistry> {
        let mut resources = BTreeMap::new();
        for resource in self.resources {
            let entity_type = resource.entity_type().to_string();
            if resources.contains_key(&entity_type) {
                return Err(FieldError::DuplicateResource { entity_type });
            }
            resources.insert(entity_type, resource);
        }

        let mut morph_map = MorphMap::new();
        for (alias, entity_type) in self.aliases {
            morph_map.insert(alias, entity_type)?;
        }

        Ok(ResourceRegistry {
            resources,
            morph_map,
            config: self.config.unwrap_or_default(),
        })
    }
}
