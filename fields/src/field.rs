//! Field descriptors.
//!
//! A `Field` describes how one attribute or relation of an entity is
//! displayed, validated and filled. Fields are built fresh for every
//! request by `Resource::fields` and are never persisted.

use std::fmt;
use std::sync::Arc;

use keel_core::{Entity, Value};

use crate::context::{OperationKind, RequestContext, VisibilityContext};
use crate::relation::{DisplayFn, PivotTable, RelationField, RelationKind};
use crate::rules::Rule;

/// Callback computing a field's value from the entity.
pub type ComputeFn = Arc<dyn Fn(&Entity) -> Value + Send + Sync>;

/// Callback providing a value when the stored one is null.
pub type DefaultFn = Arc<dyn Fn(&RequestContext) -> Value + Send + Sync>;

/// Callback run on the entity right before the field is filled.
pub type BeforeSaveFn = Arc<dyn Fn(&mut Entity, &RequestContext) + Send + Sync>;

/// Scalar field types.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    DateTime,
    Email,
    Select { options: Vec<Value> },
    File,
    Password,
    Hidden,
}

impl ScalarType {
    pub fn tag(&self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Textarea => "textarea",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::DateTime => "dateTime",
            ScalarType::Email => "email",
            ScalarType::Select { .. } => "select",
            ScalarType::File => "file",
            ScalarType::Password => "password",
            ScalarType::Hidden => "hidden",
        }
    }
}

/// What a field describes: a plain attribute or a relation.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarType),
    Relation(RelationField),
}

/// Per-context visibility flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub index: bool,
    pub detail: bool,
    pub create: bool,
    pub update: bool,
}

impl Visibility {
    pub const ALL: Visibility = Visibility {
        index: true,
        detail: true,
        create: true,
        update: true,
    };

    pub fn allows(&self, context: VisibilityContext) -> bool {
        match context {
            VisibilityContext::Index => self.index,
            VisibilityContext::Detail => self.detail,
            VisibilityContext::Create => self.create,
            VisibilityContext::Update => self.update,
        }
    }

    fn for_kind(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Scalar(ScalarType::Password | ScalarType::Hidden) => Visibility {
                index: false,
                detail: false,
                create: true,
                update: true,
            },
            FieldKind::Scalar(_) => Visibility::ALL,
            FieldKind::Relation(relation) => match relation.kind() {
                RelationKind::BelongsTo { .. } | RelationKind::MorphTo { .. } => Visibility::ALL,
                RelationKind::HasOne { .. }
                | RelationKind::HasMany { .. }
                | RelationKind::MorphOne { .. }
                | RelationKind::MorphMany { .. } => Visibility {
                    index: false,
                    detail: true,
                    create: false,
                    update: false,
                },
                RelationKind::BelongsToMany { .. } | RelationKind::MorphToMany { .. } => {
                    Visibility {
                        index: false,
                        detail: true,
                        create: true,
                        update: true,
                    }
                }
            },
        }
    }
}

/// One logical piece of data on an entity.
#[derive(Clone)]
pub struct Field {
    name: String,
    attribute: String,
    component: Option<String>,
    kind: FieldKind,
    visibility: Visibility,
    readonly: bool,
    disabled: bool,
    computed: Option<ComputeFn>,
    required: bool,
    nullable: bool,
    default: Option<DefaultFn>,
    help: Option<String>,
    rules: Vec<Rule>,
    creation_rules: Vec<Rule>,
    update_rules: Vec<Rule>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<String>,
    before_save: Option<BeforeSaveFn>,
}

impl Field {
    fn with_kind(name: impl Into<String>, attribute: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
            component: None,
            visibility: Visibility::for_kind(&kind),
            kind,
            readonly: false,
            disabled: false,
            computed: None,
            required: false,
            nullable: false,
            default: None,
            help: None,
            rules: Vec::new(),
            creation_rules: Vec::new(),
            update_rules: Vec::new(),
            min: None,
            max: None,
            pattern: None,
            before_save: None,
        }
    }

    // ========== Scalar Constructors ==========

    pub fn scalar(
        name: impl Into<String>,
        attribute: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Self {
        Self::with_kind(name, attribute, FieldKind::Scalar(scalar_type))
    }

    pub fn text(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Text)
    }

    pub fn textarea(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Textarea)
    }

    pub fn number(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Number)
    }

    pub fn boolean(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Boolean)
    }

    pub fn date(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Date)
    }

    pub fn date_time(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::DateTime)
    }

    pub fn email(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Email)
    }

    pub fn select<I, V>(name: impl Into<String>, attribute: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::scalar(name, attribute, ScalarType::Select { options })
    }

    pub fn file(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::File)
    }

    pub fn password(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Password)
    }

    pub fn hidden(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::scalar(name, attribute, ScalarType::Hidden)
    }

    // ========== Relation Constructors ==========

    pub fn relation(name: impl Into<String>, relation: RelationField) -> Self {
        Self::with_kind(name, "", FieldKind::Relation(relation))
    }

    /// Foreign key defaults to `{relation}_id`.
    pub fn belongs_to(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
    ) -> Self {
        let relation = relation.into();
        let kind = RelationKind::BelongsTo {
            foreign_key: format!("{}_id", relation),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    pub fn has_one(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let kind = RelationKind::HasOne {
            foreign_key: foreign_key.into(),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    pub fn has_many(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let kind = RelationKind::HasMany {
            foreign_key: foreign_key.into(),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    /// Columns default to `{relation}_type` and `{relation}_id`.
    pub fn morph_to<I, S>(name: impl Into<String>, relation: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let relation = relation.into();
        let kind = RelationKind::MorphTo {
            type_column: format!("{}_type", relation),
            id_column: format!("{}_id", relation),
            types: types.into_iter().map(Into::into).collect(),
        };
        Self::relation(name, RelationField::new(kind, relation, ""))
    }

    /// The related side stores `{morph_name}_type` and `{morph_name}_id`.
    pub fn morph_one(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        morph_name: &str,
    ) -> Self {
        let kind = RelationKind::MorphOne {
            type_column: format!("{}_type", morph_name),
            id_column: format!("{}_id", morph_name),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    /// The related side stores `{morph_name}_type` and `{morph_name}_id`.
    pub fn morph_many(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        morph_name: &str,
    ) -> Self {
        let kind = RelationKind::MorphMany {
            type_column: format!("{}_type", morph_name),
            id_column: format!("{}_id", morph_name),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    pub fn belongs_to_many(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        pivot: PivotTable,
    ) -> Self {
        let kind = RelationKind::BelongsToMany { pivot };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    /// The pivot table stores the parent's alias in `{morph_name}_type`.
    pub fn morph_to_many(
        name: impl Into<String>,
        relation: impl Into<String>,
        related_type: impl Into<String>,
        pivot: PivotTable,
        morph_name: &str,
    ) -> Self {
        let kind = RelationKind::MorphToMany {
            pivot,
            morph_type_column: format!("{}_type", morph_name),
        };
        Self::relation(name, RelationField::new(kind, relation, related_type))
    }

    // ========== Builder Methods ==========

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Derive the value from the entity. Computed fields are never filled.
    pub fn computed(mut self, callback: impl Fn(&Entity) -> Value + Send + Sync + 'static) -> Self {
        self.computed = Some(Arc::new(callback));
        self
    }

    pub fn default_value(
        mut self,
        provider: impl Fn(&RequestContext) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(Arc::new(provider));
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn creation_rules(mut self, rules: Vec<Rule>) -> Self {
        self.creation_rules.extend(rules);
        self
    }

    pub fn update_rules(mut self, rules: Vec<Rule>) -> Self {
        self.update_rules.extend(rules);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn before_save(
        mut self,
        hook: impl Fn(&mut Entity, &RequestContext) + Send + Sync + 'static,
    ) -> Self {
        self.before_save = Some(Arc::new(hook));
        self
    }

    pub fn hide_from_index(mut self) -> Self {
        self.visibility.index = false;
        self
    }

    pub fn hide_from_detail(mut self) -> Self {
        self.visibility.detail = false;
        self
    }

    pub fn hide_when_creating(mut self) -> Self {
        self.visibility.create = false;
        self
    }

    pub fn hide_when_updating(mut self) -> Self {
        self.visibility.update = false;
        self
    }

    pub fn show_on_index(mut self) -> Self {
        self.visibility.index = true;
        self
    }

    pub fn show_on_creating(mut self) -> Self {
        self.visibility.create = true;
        self
    }

    pub fn show_on_updating(mut self) -> Self {
        self.visibility.update = true;
        self
    }

    pub fn only_on_forms(mut self) -> Self {
        self.visibility = Visibility {
            index: false,
            detail: false,
            create: true,
            update: true,
        };
        self
    }

    pub fn except_on_forms(mut self) -> Self {
        self.visibility.create = false;
        self.visibility.update = false;
        self
    }

    pub fn only_on_detail(mut self) -> Self {
        self.visibility = Visibility {
            index: false,
            detail: true,
            create: false,
            update: false,
        };
        self
    }

    // ========== Relation Builder Methods ==========
    // These are no-ops on scalar fields.

    pub fn display_using(
        mut self,
        callback: impl Fn(&Entity) -> String + Send + Sync + 'static,
    ) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            let callback: DisplayFn = Arc::new(callback);
            relation.set_display_callback(callback);
        }
        self
    }

    pub fn display_attribute(mut self, attribute: impl Into<String>) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.set_display_attribute(attribute.into());
        }
        self
    }

    pub fn searchable<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.set_searchable(attributes.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn attachment_limit(mut self, limit: usize) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.set_attachment_limit(limit);
        }
        self
    }

    pub fn sortable(mut self) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.set_sortable(true);
        }
        self
    }

    pub fn eager_load(mut self) -> Self {
        if let FieldKind::Relation(relation) = &mut self.kind {
            relation.set_eager_load(true);
        }
        self
    }

    // ========== Accessors ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Key used for input, validation errors and lookups: the attribute,
    /// or the relation name for relation fields without one.
    pub fn key(&self) -> &str {
        match (&self.kind, self.attribute.is_empty()) {
            (FieldKind::Relation(relation), true) => relation.relation_name(),
            _ => self.attribute.as_str(),
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn as_relation(&self) -> Option<&RelationField> {
        match &self.kind {
            FieldKind::Relation(relation) => Some(relation),
            FieldKind::Scalar(_) => None,
        }
    }

    pub fn scalar_type(&self) -> Option<&ScalarType> {
        match &self.kind {
            FieldKind::Scalar(scalar) => Some(scalar),
            FieldKind::Relation(_) => None,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match &self.kind {
            FieldKind::Scalar(scalar) => scalar.tag(),
            FieldKind::Relation(relation) => relation.kind().tag(),
        }
    }

    /// Presentation hint; opaque to the engine.
    pub fn component_name(&self) -> String {
        self.component
            .clone()
            .unwrap_or_else(|| format!("{}-field", self.type_tag()))
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible_for(&self, context: VisibilityContext) -> bool {
        self.visibility.allows(context)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    pub fn computed_callback(&self) -> Option<&ComputeFn> {
        self.computed.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_provider(&self) -> Option<&DefaultFn> {
        self.default.as_ref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn before_save_hook(&self) -> Option<&BeforeSaveFn> {
        self.before_save.as_ref()
    }

    /// Fill writes nothing for readonly, disabled and computed fields.
    pub fn is_fillable(&self) -> bool {
        !self.readonly && !self.disabled && self.computed.is_none()
    }

    /// Filling needs the entity's identity, so it happens after the first save.
    pub fn defers_to_after_save(&self) -> bool {
        self.as_relation()
            .map_or(false, |relation| relation.kind().is_pivot())
    }

    /// Input key carrying pivot data for pivot relations.
    pub fn pivot_input_key(&self) -> String {
        format!("{}_pivot", self.key())
    }

    /// Input key carrying the type alias for `MorphTo` fields.
    pub fn morph_type_input_key(&self) -> String {
        format!("{}_type", self.key())
    }

    // ========== Validation Rules ==========

    /// Rules derived from the field's configuration, keyed by input key.
    ///
    /// `MorphTo` fields constrain two keys: the type alias and the id.
    pub fn validation_rules(&self, operation: OperationKind) -> Vec<(String, Vec<Rule>)> {
        let mut rules = Vec::new();
        if self.required {
            rules.push(Rule::Required);
        }
        if self.nullable {
            rules.push(Rule::Nullable);
        }

        let mut keyed = Vec::new();
        match &self.kind {
            FieldKind::Scalar(scalar) => {
                match scalar {
                    ScalarType::Text | ScalarType::Textarea | ScalarType::Password => {
                        rules.push(Rule::String)
                    }
                    ScalarType::Number => rules.push(Rule::Numeric),
                    ScalarType::Boolean => rules.push(Rule::Boolean),
                    ScalarType::Date | ScalarType::DateTime => rules.push(Rule::Date),
                    ScalarType::Email => rules.push(Rule::Email),
                    ScalarType::Select { options } => rules.push(Rule::In(options.clone())),
                    ScalarType::File | ScalarType::Hidden => {}
                }
                if let Some(min) = self.min {
                    rules.push(Rule::Min(min));
                }
                if let Some(max) = self.max {
                    rules.push(Rule::Max(max));
                }
                if let Some(pattern) = &self.pattern {
                    rules.push(Rule::Pattern(pattern.clone()));
                }
            }
            FieldKind::Relation(relation) => match relation.kind() {
                RelationKind::BelongsTo { .. } => rules.push(Rule::Exists {
                    entity_type: relation.related_type().to_string(),
                }),
                RelationKind::MorphTo { types, .. } => {
                    let mut type_rules = Vec::new();
                    if self.required {
                        type_rules.push(Rule::Required);
                    }
                    type_rules.push(Rule::Nullable);
                    type_rules.push(Rule::MorphType {
                        types: types.clone(),
                    });
                    keyed.push((self.morph_type_input_key(), type_rules));
                    rules.push(Rule::Integer);
                }
                RelationKind::BelongsToMany { .. } | RelationKind::MorphToMany { .. } => {
                    rules.push(Rule::Array);
                    rules.push(Rule::Distinct);
                    rules.push(Rule::EachExists {
                        entity_type: relation.related_type().to_string(),
                    });
                }
                RelationKind::HasOne { .. }
                | RelationKind::HasMany { .. }
                | RelationKind::MorphOne { .. }
                | RelationKind::MorphMany { .. } => {}
            },
        }

        rules.extend(self.rules.iter().cloned());
        match operation {
            OperationKind::Create => rules.extend(self.creation_rules.iter().cloned()),
            OperationKind::Update => rules.extend(self.update_rules.iter().cloned()),
        }

        keyed.insert(0, (self.key().to_string(), rules));
        keyed
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("attribute", &self.attribute)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("readonly", &self.readonly)
            .field("disabled", &self.disabled)
            .field("computed", &self.computed.is_some())
            .field("required", &self.required)
            .field("nullable", &self.nullable)
            .finish()
    }
}
