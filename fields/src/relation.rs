//! Relation field descriptors.
//!
//! The set of relation shapes is closed: every consumer matches on
//! `RelationKind` and the compiler keeps those matches exhaustive.

use std::fmt;
use std::sync::Arc;

use keel_core::Entity;

/// Callback producing a related entity's display label.
pub type DisplayFn = Arc<dyn Fn(&Entity) -> String + Send + Sync>;

/// Join table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    /// Table name.
    pub table: String,
    /// Column holding the parent's identifier.
    pub parent_key: String,
    /// Column holding the related entity's identifier.
    pub related_key: String,
    /// Extra pivot columns that may be written. Anything else is dropped.
    pub columns: Vec<String>,
}

impl PivotTable {
    pub fn new(
        table: impl Into<String>,
        parent_key: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            parent_key: parent_key.into(),
            related_key: related_key.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Shape of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// The parent holds `foreign_key` pointing at the related entity.
    BelongsTo { foreign_key: String },
    /// One related entity holds `foreign_key` pointing at the parent.
    HasOne { foreign_key: String },
    /// Related entities hold `foreign_key` pointing at the parent.
    HasMany { foreign_key: String },
    /// The parent holds a (type alias, id) pair pointing at one of `types`.
    MorphTo {
        type_column: String,
        id_column: String,
        types: Vec<String>,
    },
    /// One related entity holds a (type alias, id) pair pointing at the parent.
    MorphOne {
        type_column: String,
        id_column: String,
    },
    /// Related entities hold a (type alias, id) pair pointing at the parent.
    MorphMany {
        type_column: String,
        id_column: String,
    },
    /// Membership lives in a pivot table.
    BelongsToMany { pivot: PivotTable },
    /// Membership lives in a pivot table keyed by the parent's (type alias, id).
    MorphToMany {
        pivot: PivotTable,
        morph_type_column: String,
    },
}

impl RelationKind {
    /// Type tag as exposed to clients.
    pub fn tag(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo { .. } => "belongsTo",
            RelationKind::HasOne { .. } => "hasOne",
            RelationKind::HasMany { .. } => "hasMany",
            RelationKind::MorphTo { .. } => "morphTo",
            RelationKind::MorphOne { .. } => "morphOne",
            RelationKind::MorphMany { .. } => "morphMany",
            RelationKind::BelongsToMany { .. } => "belongsToMany",
            RelationKind::MorphToMany { .. } => "morphToMany",
        }
    }

    /// Resolves to a single item rather than a collection.
    pub fn is_to_one(&self) -> bool {
        matches!(
            self,
            RelationKind::BelongsTo { .. }
                | RelationKind::HasOne { .. }
                | RelationKind::MorphTo { .. }
                | RelationKind::MorphOne { .. }
        )
    }

    /// Membership is stored in a pivot table.
    pub fn is_pivot(&self) -> bool {
        matches!(
            self,
            RelationKind::BelongsToMany { .. } | RelationKind::MorphToMany { .. }
        )
    }

    /// The parent entity stores the relation itself, so `fill` writes it.
    pub fn is_owned_by_parent(&self) -> bool {
        matches!(
            self,
            RelationKind::BelongsTo { .. } | RelationKind::MorphTo { .. }
        )
    }

    pub fn pivot(&self) -> Option<&PivotTable> {
        match self {
            RelationKind::BelongsToMany { pivot } | RelationKind::MorphToMany { pivot, .. } => {
                Some(pivot)
            }
            _ => None,
        }
    }

    /// Ceiling implied by the shape itself.
    pub fn implicit_limit(&self) -> Option<usize> {
        match self {
            RelationKind::HasOne { .. } | RelationKind::MorphOne { .. } => Some(1),
            _ => None,
        }
    }
}

/// Relation-specific part of a field.
#[derive(Clone)]
pub struct RelationField {
    kind: RelationKind,
    relation_name: String,
    related_type: String,
    display_callback: Option<DisplayFn>,
    display_attribute: Option<String>,
    searchable: Vec<String>,
    attachment_limit: Option<usize>,
    sortable: bool,
    eager_load: bool,
}

impl RelationField {
    /// `related_type` is empty for `MorphTo`, whose target varies per entity.
    pub fn new(
        kind: RelationKind,
        relation_name: impl Into<String>,
        related_type: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            relation_name: relation_name.into(),
            related_type: related_type.into(),
            display_callback: None,
            display_attribute: None,
            searchable: Vec::new(),
            attachment_limit: None,
            sortable: false,
            eager_load: false,
        }
    }

    // ========== Accessors ==========

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    pub fn related_type(&self) -> &str {
        &self.related_type
    }

    pub fn display_callback(&self) -> Option<&DisplayFn> {
        self.display_callback.as_ref()
    }

    pub fn display_attribute(&self) -> Option<&str> {
        self.display_attribute.as_deref()
    }

    pub fn searchable(&self) -> &[String] {
        &self.searchable
    }

    /// Declared limit, or the one implied by the relation shape.
    pub fn attachment_limit(&self) -> Option<usize> {
        match (self.attachment_limit, self.kind.implicit_limit()) {
            (Some(declared), Some(implied)) => Some(declared.min(implied)),
            (declared, implied) => declared.or(implied),
        }
    }

    /// Declared pivot columns (empty for non-pivot relations).
    pub fn pivot_columns(&self) -> &[String] {
        self.kind
            .pivot()
            .map(|pivot| pivot.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Only to-one relations stored on the parent can be sorted by.
    pub fn sortable(&self) -> bool {
        self.sortable && self.kind.is_owned_by_parent()
    }

    pub fn eager_load(&self) -> bool {
        self.eager_load
    }

    // ========== Configuration ==========

    pub(crate) fn set_display_callback(&mut self, callback: DisplayFn) {
        self.display_callback = Some(callback);
    }

    pub(crate) fn set_display_attribute(&mut self, attribute: String) {
        self.display_attribute = Some(attribute);
    }

    pub(crate) fn set_searchable(&mut self, attributes: Vec<String>) {
        self.searchable = attributes;
    }

    pub(crate) fn set_attachment_limit(&mut self, limit: usize) {
        self.attachment_limit = Some(limit);
    }

    pub(crate) fn set_sortable(&mut self, sortable: bool) {
        self.sortable = sortable;
    }

    pub(crate) fn set_eager_load(&mut self, eager_load: bool) {
        self.eager_load = eager_load;
    }
}

impl fmt::Debug for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationField")
            .field("kind", &self.kind)
            .field("relation_name", &self.relation_name)
            .field("related_type", &self.related_type)
            .field("display_callback", &self.display_callback.is_some())
            .field("display_attribute", &self.display_attribute)
            .field("searchable", &self.searchable)
            .field("attachment_limit", &self.attachment_limit)
            .finish()
    }
}
