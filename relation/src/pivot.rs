//! Attachment for relations stored in a join table.

use std::collections::BTreeMap;

use keel_core::{Attributes, Entity, EntityId, Value};
use keel_fields::{PivotTable, RelationField, ResourceRegistry};
use keel_store::{Condition, Store};

use crate::attachment::{exclude_ids, partition, Scope, Syncable};
use crate::error::{RelationError, RelationResult};
use crate::outcome::{AttachOutcome, ChangeSet, DetachOutcome};
use crate::pivot_data::PivotData;

/// Current pivot rows keyed by related id, in insertion order of the ids.
struct Membership {
    ids: Vec<EntityId>,
    rows: BTreeMap<EntityId, Attributes>,
}

/// BelongsToMany and MorphToMany.
#[derive(Debug, Clone)]
pub struct PivotAttachment<'f> {
    relation: &'f RelationField,
    pivot: &'f PivotTable,
    morph_type_column: Option<&'f str>,
}

impl<'f> PivotAttachment<'f> {
    pub fn new(
        relation: &'f RelationField,
        pivot: &'f PivotTable,
        morph_type_column: Option<&'f str>,
    ) -> Self {
        Self {
            relation,
            pivot,
            morph_type_column,
        }
    }

    pub fn relation(&self) -> &'f RelationField {
        self.relation
    }

    pub fn pivot(&self) -> &'f PivotTable {
        self.pivot
    }

    /// Conditions selecting the parent's rows.
    fn parent_conditions(&self, scope: &Scope<'_>) -> Vec<Condition> {
        let mut conditions = vec![Condition::eq(&self.pivot.parent_key, scope.parent_id)];
        if let Some(column) = self.morph_type_column {
            conditions.push(Condition::eq(column, scope.metadata.parent_alias.as_str()));
        }
        conditions
    }

    fn row_conditions(&self, scope: &Scope<'_>, ids: &[EntityId]) -> Vec<Condition> {
        let mut conditions = self.parent_conditions(scope);
        conditions.push(Condition::is_in(
            &self.pivot.related_key,
            ids.iter().copied().map(Value::from).collect(),
        ));
        conditions
    }

    fn membership(&self, store: &dyn Store, scope: &Scope<'_>) -> RelationResult<Membership> {
        let rows = store.pivot_select(&self.pivot.table, &self.parent_conditions(scope))?;
        let mut membership = Membership {
            ids: Vec::new(),
            rows: BTreeMap::new(),
        };
        for row in rows {
            let Some(id) = row.get(&self.pivot.related_key).and_then(EntityId::from_value) else {
                continue;
            };
            if !membership.rows.contains_key(&id) {
                membership.ids.push(id);
                membership.rows.insert(id, row);
            }
        }
        Ok(membership)
    }

    pub(crate) fn exclusion(
        &self,
        store: &dyn Store,
        scope: &Scope<'_>,
    ) -> RelationResult<Condition> {
        Ok(exclude_ids(&self.membership(store, scope)?.ids))
    }

    fn insert_rows(
        &self,
        store: &mut dyn Store,
        scope: &Scope<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
    ) -> RelationResult<()> {
        for id in ids {
            let mut row = pivot.filtered_for(*id, &self.pivot.columns);
            row.insert(self.pivot.parent_key.clone(), Value::from(scope.parent_id));
            row.insert(self.pivot.related_key.clone(), Value::from(*id));
            if let Some(column) = self.morph_type_column {
                row.insert(
                    column.to_string(),
                    Value::from(scope.metadata.parent_alias.as_str()),
                );
            }
            store.pivot_insert(&self.pivot.table, row)?;
        }
        Ok(())
    }

    pub(crate) fn attach(
        &self,
        store: &mut dyn Store,
        scope: &Scope<'_>,
        ids: &[EntityId],
        pivot: &PivotData,
    ) -> RelationResult<AttachOutcome> {
        let current = self.membership(&*store, scope)?;
        let (fresh, already_attached) = partition(ids, &current.ids);
        scope.check_limit(current.ids.len(), fresh.len())?;
        require_related(&*store, scope, &fresh)?;
        self.insert_rows(store, scope, &fresh, pivot)?;
        Ok(AttachOutcome {
            attached: fresh,
            already_attached,
        })
    }

    pub(crate) fn detach(
        &self,
        store: &mut dyn Store,
        scope: &Scope<'_>,
        ids: &[EntityId],
    ) -> RelationResult<DetachOutcome> {
        let current = self.membership(&*store, scope)?;
        let targets: Vec<EntityId> = current
            .ids
            .iter()
            .copied()
            .filter(|id| ids.contains(id))
            .collect();
        if !targets.is_empty() {
            store.pivot_delete(&self.pivot.table, &self.row_conditions(scope, &targets))?;
        }
        Ok(DetachOutcome::of(targets))
    }
}

impl Syncable for PivotAttachment<'_> {
    fn sync(
        &self,
        store: &mut dyn Store,
        registry: &ResourceRegistry,
        parent: &Entity,
        ids: &[EntityId],
        pivot: &PivotData,
        detaching: bool,
    ) -> RelationResult<ChangeSet> {
        let scope = Scope::resolve(self.relation, &*store, registry, parent)?;
        let current = self.membership(&*store, &scope)?;

        let mut target: Vec<EntityId> = Vec::new();
        for id in ids {
            if !target.contains(id) {
                target.push(*id);
            }
        }
        // Sync replaces the membership, so only the target size matters.
        if let Some(limit) = self.relation.attachment_limit() {
            if target.len() > limit {
                tracing::info!(
                    relation = %self.relation.relation_name(),
                    limit,
                    attempted = target.len(),
                    "sync exceeds attachment limit"
                );
                return Err(RelationError::limit_exceeded(
                    current.ids.len(),
                    limit,
                    target.len(),
                ));
            }
        }

        let attached: Vec<EntityId> = target
            .iter()
            .copied()
            .filter(|id| !current.rows.contains_key(id))
            .collect();
        let detached: Vec<EntityId> = if detaching {
            current
                .ids
                .iter()
                .copied()
                .filter(|id| !target.contains(id))
                .collect()
        } else {
            Vec::new()
        };
        let updates: Vec<(EntityId, Attributes)> = target
            .iter()
            .filter_map(|id| {
                let existing = current.rows.get(id)?;
                let supplied = pivot.filtered_for(*id, &self.pivot.columns);
                differs(existing, &supplied).then_some((*id, supplied))
            })
            .collect();

        require_related(&*store, &scope, &attached)?;
        if !detached.is_empty() {
            store.pivot_delete(&self.pivot.table, &self.row_conditions(&scope, &detached))?;
        }
        self.insert_rows(store, &scope, &attached, pivot)?;
        for (id, values) in &updates {
            store.pivot_update(
                &self.pivot.table,
                &self.row_conditions(&scope, std::slice::from_ref(id)),
                values,
            )?;
        }

        let changes = ChangeSet {
            attached,
            detached,
            updated: updates.into_iter().map(|(id, _)| id).collect(),
        };
        tracing::debug!(
            relation = %self.relation.relation_name(),
            parent = %scope.parent_id,
            attached = changes.attached.len(),
            detached = changes.detached.len(),
            updated = changes.updated.len(),
            "synced relation"
        );
        Ok(changes)
    }
}

/// Every id must name an existing related entity before the first write.
fn require_related(store: &dyn Store, scope: &Scope<'_>, ids: &[EntityId]) -> RelationResult<()> {
    for id in ids {
        scope.load_related(store, *id)?;
    }
    Ok(())
}

/// True when a supplied pivot value differs from the stored row.
fn differs(existing: &Attributes, supplied: &Attributes) -> bool {
    supplied.iter().any(|(column, value)| {
        let stored = existing.get(column).unwrap_or(&Value::Null);
        !(stored.is_null() && value.is_null()) && !stored.loose_eq(value)
    })
}
