//! Query description handed to the storage driver.
//!
//! Queries are plain data: a conjunction of column conditions, an optional
//! OR-chain text search, and a window. Drivers decide how to execute them;
//! `Condition::matches` and `Search::matches` give the reference semantics.

use keel_core::{Attributes, Entity, Value};

/// Name of the pseudo-column that addresses an entity's identifier.
pub const ID_COLUMN: &str = "id";

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Column equals the value.
    Eq(String, Value),
    /// Column differs from the value. A null column counts as different.
    NotEq(String, Value),
    /// Column is null or absent.
    IsNull(String),
    /// Column equals one of the values.
    In(String, Vec<Value>),
    /// Column equals none of the values. A null column counts as not in.
    NotIn(String, Vec<Value>),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn not_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEq(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In(column.into(), values)
    }

    pub fn not_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::NotIn(column.into(), values)
    }

    /// The column this condition constrains.
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(c, _)
            | Condition::NotEq(c, _)
            | Condition::IsNull(c)
            | Condition::In(c, _)
            | Condition::NotIn(c, _) => c,
        }
    }

    /// Evaluate against a column value (`Value::Null` when the column is absent).
    pub fn matches_value(&self, actual: &Value) -> bool {
        match self {
            Condition::Eq(_, expected) => !actual.is_null() && actual.loose_eq(expected),
            Condition::NotEq(_, expected) => actual.is_null() || !actual.loose_eq(expected),
            Condition::IsNull(_) => actual.is_null(),
            Condition::In(_, values) => {
                !actual.is_null() && values.iter().any(|v| actual.loose_eq(v))
            }
            Condition::NotIn(_, values) => {
                actual.is_null() || !values.iter().any(|v| actual.loose_eq(v))
            }
        }
    }

    /// Evaluate against a raw row (pivot tables).
    pub fn matches_row(&self, row: &Attributes) -> bool {
        self.matches_value(row.get(self.column()).unwrap_or(&Value::Null))
    }

    /// Evaluate against an entity, resolving the `id` pseudo-column.
    pub fn matches_entity(&self, entity: &Entity) -> bool {
        self.matches_value(&column_value(entity, self.column()))
    }
}

/// An OR-chain of `LIKE %term%` matches across columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub columns: Vec<String>,
    pub term: String,
}

impl Search {
    pub fn new(columns: Vec<String>, term: impl Into<String>) -> Self {
        Self {
            columns,
            term: term.into(),
        }
    }

    /// A blank term matches everything; otherwise any column containing the term matches.
    pub fn matches(&self, entity: &Entity) -> bool {
        let term = self.term.trim();
        if term.is_empty() {
            return true;
        }
        self.columns
            .iter()
            .any(|column| column_value(entity, column).contains_text(term))
    }
}

/// A query over one entity type. Results are ordered by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub entity_type: String,
    pub conditions: Vec<Condition>,
    pub search: Option<Search>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            conditions: Vec::new(),
            search: None,
            limit: None,
            offset: 0,
        }
    }

    /// Add a condition (conditions are ANDed).
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Attach an OR-chain search.
    pub fn search(mut self, search: Search) -> Self {
        self.search = Some(search);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if the entity satisfies every condition and the search.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|c| c.matches_entity(entity))
            && self.search.as_ref().map_or(true, |s| s.matches(entity))
    }

    /// The same query without its window, for counting.
    pub fn unbounded(&self) -> Self {
        Self {
            limit: None,
            offset: 0,
            ..self.clone()
        }
    }
}

fn column_value(entity: &Entity, column: &str) -> Value {
    if column == ID_COLUMN {
        return entity.id.map(Value::from).unwrap_or(Value::Null);
    }
    entity.attr_or_null(column).clone()
}
