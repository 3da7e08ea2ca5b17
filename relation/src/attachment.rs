//! Attachment services.
//!
//! One service per relation shape, selected from the field's `RelationKind`:
//! - `Owned` covers relations whose related entities hold the link
//!   (HasOne, HasMany, MorphOne, MorphMany)
//! - `Pivot` covers relations stored in a join table
//!   (BelongsToMany, MorphToMany)
//!
//! Relations stored on the parent (BelongsTo, MorphTo) are written by `fill`
//! and have no attachment service.
//!
//! Every operation reads the current membership once, at its start, and
//! computes its writes from that snapshot.

use keel_core::{Entity, EntityId, Value};
use keel_fields::{
    resolve_label, Field, FieldKind, RelationField, RelationKind, RelationMetadata,
    ResourceRegistry,
};
use keel_store::{Condition, Query, Search, Store, ID_COLUMN};

use crate::error::{RelationError, RelationResult};
use crate::outcome::{
    AttachOutcome, AttachableItem, AttachableRequest, ChangeSet, DetachOutcome, Page,
};
use crate::owned::{Link, OwnedAttachment};
use crate::pivot::PivotAttachment;
use crate::pivot_data::PivotData;

/// Full-membership replacement.
pub trait Syncable {
    /// Make the membership equal `ids`. With `detaching` false, current
    /// members missing from `ids` are left in place.
    fn sync(
        &self,
        store: &mut dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        ids: &[EntityId],
        pivot: &PivotData,
        detaching: bool,
    ) -> RelationResult<ChangeSet>;
}

/// Attachment service for one relation field.
#[derive(Debug, Clone)]
pub enum Attachment<'f> {
    Owned(OwnedAttachment<'f>),
    Pivot(PivotAttachment<'f>),
}

impl<'f> Attachment<'f> {
    /// Select the service for a field.
    pub fn for_field(field: &'f Field) -> RelationResult<Self> {
        let relation = match field.kind() {
            FieldKind::Relation(relation) => relation,
            FieldKind::Scalar(_) => {
                return Err(RelationError::NotARelation {
                    key: field.key().to_string(),
                })
            }
        };

        let attachment = match relation.kind() {
            RelationKind::BelongsTo { .. } | RelationKind::MorphTo { .. } => {
                return Err(RelationError::unsupported(
                    "attachment",
                    relation.relation_name(),
                ))
            }
            RelationKind::HasOne { foreign_key } | RelationKind::HasMany { foreign_key } => {
                Attachment::Owned(OwnedAttachment::new(relation, Link::ForeignKey { foreign_key }))
            }
            RelationKind::MorphOne {
                type_column,
                id_column,
            }
            | RelationKind::MorphMany {
                type_column,
                id_column,
            } => Attachment::Owned(OwnedAttachment::new(
                relation,
                Link::Morph {
                    type_column,
                    id_column,
                },
            )),
            RelationKind::BelongsToMany { pivot } => {
                Attachment::Pivot(PivotAttachment::new(relation, pivot, None))
            }
            RelationKind::MorphToMany {
                pivot,
                morph_type_column,
            } => Attachment::Pivot(PivotAttachment::new(
                relation,
                pivot,
                Some(morph_type_column.as_str()),
            )),
        };
        Ok(attachment)
    }

    pub fn relation(&self) -> &'f RelationField {
        match self {
            Attachment::Owned(owned) => owned.relation(),
            Attachment::Pivot(pivot) => pivot.relation(),
        }
    }

    // ========== Operations ==========

    /// Related entities not yet associated with `parent`.
    pub fn list_attachable(
        &self,
        store: &dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        request: &AttachableRequest,
    ) -> RelationResult<Page> {
        let scope = Scope::resolve(self.relation(), store, registry, parent)?;
        let exclusion = match self {
            Attachment::Owned(owned) => owned.exclusion(store, &scope)?,
            Attachment::Pivot(pivot) => pivot.exclusion(store, &scope)?,
        };

        let mut query = Query::new(&scope.metadata.related_type).filter(exclusion);
        if let Some(term) = request.search.as_deref().filter(|term| !term.trim().is_empty()) {
            query = query.search(Search::new(scope.searchable_attributes(), term.trim()));
        }

        let config = registry.config();
        let page = request.page.max(1);
        let per_page = config.per_page(request.per_page);
        let total = store.count(&query)?;
        let rows = store.select(&query.limit(per_page).offset((page - 1) * per_page))?;

        let items = rows
            .iter()
            .filter_map(|related| {
                Some(AttachableItem {
                    id: related.id?,
                    label: resolve_label(
                        self.relation(),
                        scope.metadata.related_resource(),
                        related,
                        &config.labels,
                    ),
                })
            })
            .collect();

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Associate `ids` with `parent`. Ids already associated are skipped.
    pub fn attach(
        &self,
        store: &mut dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        ids: &[EntityId],
        pivot: &PivotData,
    ) -> RelationResult<AttachOutcome> {
        let scope = Scope::resolve(self.relation(), &*store, registry, parent)?;
        let outcome = match self {
            Attachment::Owned(owned) => owned.attach(store, &scope, ids)?,
            Attachment::Pivot(attachment) => attachment.attach(store, &scope, ids, pivot)?,
        };
        tracing::debug!(
            relation = %self.relation().relation_name(),
            parent = %scope.parent_id,
            attached = outcome.attached.len(),
            already_attached = outcome.already_attached,
            "attached related entities"
        );
        Ok(outcome)
    }

    /// Remove the association of `ids` with `parent`. Related entities are kept.
    pub fn detach(
        &self,
        store: &mut dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        ids: &[EntityId],
    ) -> RelationResult<DetachOutcome> {
        let scope = Scope::resolve(self.relation(), &*store, registry, parent)?;
        let outcome = match self {
            Attachment::Owned(owned) => owned.detach(store, &scope, ids)?,
            Attachment::Pivot(pivot) => pivot.detach(store, &scope, ids)?,
        };
        tracing::debug!(
            relation = %self.relation().relation_name(),
            parent = %scope.parent_id,
            detached = outcome.detached,
            "detached related entities"
        );
        Ok(outcome)
    }

    /// Replace the membership. Only pivot relations support it.
    pub fn sync(
        &self,
        store: &mut dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        ids: &[EntityId],
        pivot: &PivotData,
        detaching: bool,
    ) -> RelationResult<ChangeSet> {
        match self {
            Attachment::Pivot(attachment) => {
                attachment.sync(store, registry, parent, ids, pivot, detaching)
            }
            Attachment::Owned(owned) => Err(RelationError::unsupported(
                "sync",
                owned.relation().relation_name(),
            )),
        }
    }
}

// ========== Shared Helpers ==========

/// Resolved context of one attachment call.
pub(crate) struct Scope<'a> {
    pub relation: &'a RelationField,
    pub registry: &'a ResourceRegistry,
    pub metadata: RelationMetadata,
    pub parent_id: EntityId,
}

impl<'a> Scope<'a> {
    pub fn resolve(
        relation: &'a RelationField,
        store: &dyn Store,
        registry: &'a ResourceRegistry,
        parent: &Entity,
    ) -> RelationResult<Self> {
        let parent_id = parent
            .id
            .ok_or_else(|| RelationError::parent_not_saved(relation.relation_name()))?;
        let metadata =
            RelationMetadata::resolve_relation(relation, &parent.entity_type, registry, store)
                .ok_or_else(|| RelationError::unresolved(relation.relation_name()))?;
        Ok(Self {
            relation,
            registry,
            metadata,
            parent_id,
        })
    }

    /// Field-declared, else resource-declared, else configured attributes.
    pub fn searchable_attributes(&self) -> Vec<String> {
        if !self.relation.searchable().is_empty() {
            return self.relation.searchable().to_vec();
        }
        if let Some(declared) = self
            .metadata
            .related_resource()
            .map(|resource| resource.searchable_attributes())
            .filter(|declared| !declared.is_empty())
        {
            return declared;
        }
        self.registry.config().search.fallback_attributes.clone()
    }

    /// Reject the request when `current + attempted` exceeds the limit.
    pub fn check_limit(&self, current: usize, attempted: usize) -> RelationResult<()> {
        match self.relation.attachment_limit() {
            Some(limit) if current + attempted > limit => {
                tracing::info!(
                    relation = %self.relation.relation_name(),
                    current,
                    limit,
                    attempted,
                    "attachment limit exceeded"
                );
                Err(RelationError::limit_exceeded(current, limit, attempted))
            }
            _ => Ok(()),
        }
    }

    /// Load a related entity that must exist.
    pub fn load_related(&self, store: &dyn Store, id: EntityId) -> RelationResult<Entity> {
        store
            .load(&self.metadata.related_type, id)?
            .ok_or_else(|| RelationError::related_not_found(&self.metadata.related_type, id))
    }
}

/// Requested ids split by the snapshot into (new, already present).
pub(crate) fn partition(ids: &[EntityId], current: &[EntityId]) -> (Vec<EntityId>, usize) {
    let mut fresh: Vec<EntityId> = Vec::new();
    let mut present = 0;
    for id in ids {
        if current.contains(id) {
            present += 1;
        } else if !fresh.contains(id) {
            fresh.push(*id);
        }
    }
    (fresh, present)
}

/// Exclude the snapshot by identifier.
pub(crate) fn exclude_ids(ids: &[EntityId]) -> Condition {
    Condition::not_in(ID_COLUMN, ids.iter().copied().map(Value::from).collect())
}
