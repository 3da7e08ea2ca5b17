//! Results of attachment operations.

use keel_core::EntityId;
use serde::{Deserialize, Serialize};

/// Membership changes produced by a sync. The three sets are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub attached: Vec<EntityId>,
    pub detached: Vec<EntityId>,
    /// Ids kept whose pivot data actually changed.
    pub updated: Vec<EntityId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty() && self.updated.is_empty()
    }
}

/// Result of an attach.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachOutcome {
    pub attached: Vec<EntityId>,
    /// Requested ids that were already associated and were skipped.
    pub already_attached: usize,
}

/// Result of a detach.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetachOutcome {
    pub detached: usize,
    /// The ids actually released.
    #[serde(skip)]
    pub ids: Vec<EntityId>,
}

impl DetachOutcome {
    pub fn of(ids: Vec<EntityId>) -> Self {
        Self {
            detached: ids.len(),
            ids,
        }
    }
}

/// Paging and search for attachable listings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttachableRequest {
    pub search: Option<String>,
    /// One-based page number; zero is read as one.
    pub page: usize,
    pub per_page: Option<usize>,
}

impl AttachableRequest {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }
}

/// A related entity that may be attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachableItem {
    pub id: EntityId,
    pub label: String,
}

/// One page of attachable entities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<AttachableItem>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl Page {
    pub fn ids(&self) -> Vec<EntityId> {
        self.items.iter().map(|item| item.id).collect()
    }
}
