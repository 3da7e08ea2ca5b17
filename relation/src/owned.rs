//! Attachment for relations whose related entities hold the link.

use keel_core::{Attributes, EntityId, Value};
use keel_fields::RelationField;
use keel_store::{Condition, Query, Store};

use crate::attachment::{exclude_ids, partition, Scope};
use crate::error::RelationResult;
use crate::outcome::{AttachOutcome, DetachOutcome};

/// Columns on the related entity that point at the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link<'f> {
    ForeignKey {
        foreign_key: &'f str,
    },
    /// A (type alias, id) pair. The alias is the parent's morph alias.
    Morph {
        type_column: &'f str,
        id_column: &'f str,
    },
}

/// HasOne, HasMany, MorphOne and MorphMany.
#[derive(Debug, Clone)]
pub struct OwnedAttachment<'f> {
    relation: &'f RelationField,
    link: Link<'f>,
}

impl<'f> OwnedAttachment<'f> {
    pub fn new(relation: &'f RelationField, link: Link<'f>) -> Self {
        Self { relation, link }
    }

    pub fn relation(&self) -> &'f RelationField {
        self.relation
    }

    pub fn link(&self) -> Link<'f> {
        self.link
    }

    fn link_conditions(&self, scope: &Scope<'_>) -> Vec<Condition> {
        match self.link {
            Link::ForeignKey { foreign_key } => vec![Condition::eq(foreign_key, scope.parent_id)],
            Link::Morph {
                type_column,
                id_column,
            } => vec![
                Condition::eq(type_column, scope.metadata.parent_alias.as_str()),
                Condition::eq(id_column, scope.parent_id),
            ],
        }
    }

    /// Ids currently linked to the parent.
    pub(crate) fn membership(
        &self,
        store: &dyn Store,
        scope: &Scope<'_>,
    ) -> RelationResult<Vec<EntityId>> {
        let query = self
            .link_conditions(scope)
            .into_iter()
            .fold(Query::new(&scope.metadata.related_type), Query::filter);
        Ok(store
            .select(&query)?
            .into_iter()
            .filter_map(|related| related.id)
            .collect())
    }

    /// Condition selecting related entities not linked to the parent.
    pub(crate) fn exclusion(
        &self,
        store: &dyn Store,
        scope: &Scope<'_>,
    ) -> RelationResult<Condition> {
        match self.link {
            Link::ForeignKey { foreign_key } => Ok(Condition::not_eq(foreign_key, scope.parent_id)),
            Link::Morph { .. } => Ok(exclude_ids(&self.membership(store, scope)?)),
        }
    }

    pub(crate) fn attach(
        &self,
        store: &mut dyn Store,
        scope: &Scope<'_>,
        ids: &[EntityId],
    ) -> RelationResult<AttachOutcome> {
        let current = self.membership(&*store, scope)?;
        let (fresh, already_attached) = partition(ids, &current);
        scope.check_limit(current.len(), fresh.len())?;

        // Every target must exist before the first write.
        let targets = fresh
            .iter()
            .map(|id| scope.load_related(&*store, *id))
            .collect::<RelationResult<Vec<_>>>()?;

        for mut related in targets {
            self.write_link(&mut related.attributes, scope, true);
            store.save(&mut related)?;
        }

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
        let targets: Vec<EntityId> = current.into_iter().filter(|id| ids.contains(id)).collect();
        for id in &targets {
            let mut related = scope.load_related(&*store, *id)?;
            self.write_link(&mut related.attributes, scope, false);
            store.save(&mut related)?;
        }
        Ok(DetachOutcome::of(targets))
    }

    /// Point the related entity at the parent, or release it.
    fn write_link(&self, attributes: &mut Attributes, scope: &Scope<'_>, linked: bool) {
        match self.link {
            Link::ForeignKey { foreign_key } => {
                let value = if linked {
                    Value::from(scope.parent_id)
                } else {
                    Value::Null
                };
                attributes.insert(foreign_key.to_string(), value);
            }
            Link::Morph {
                type_column,
                id_column,
            } => {
                let (alias, id) = if linked {
                    (
                        Value::from(scope.metadata.parent_alias.as_str()),
                        Value::from(scope.parent_id),
                    )
                } else {
                    (Value::Null, Value::Null)
                };
                attributes.insert(type_column.to_string(), alias);
                attributes.insert(id_column.to_string(), id);
            }
        }
    }
}
