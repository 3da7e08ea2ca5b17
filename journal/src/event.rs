//! Action event types.

use std::fmt;

use chrono::{DateTime, Utc};
use keel_core::{Attributes, EntityId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Groups the events of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Attach,
    Detach,
    Sync,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Attach => "attach",
            ActionKind::Detach => "detach",
            ActionKind::Sync => "sync",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Finished,
    Failed,
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub id: Uuid,
    pub batch_id: BatchId,
    pub kind: ActionKind,
    pub actor_id: Option<EntityId>,
    pub target_type: String,
    /// Absent when a create failed before the first save.
    pub target_id: Option<EntityId>,
    /// Relation key for attach, detach and sync events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Changed attributes before the action.
    pub original: Attributes,
    /// Changed attributes after the action.
    pub changes: Attributes,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionEvent {
    /// A finished event with empty snapshots.
    pub fn new(batch_id: BatchId, kind: ActionKind, target_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            kind,
            actor_id: None,
            target_type: target_type.into(),
            target_id: None,
            relation: None,
            original: Attributes::new(),
            changes: Attributes::new(),
            status: ActionStatus::Finished,
            exception: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn actor(mut self, actor_id: Option<EntityId>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn target(mut self, target_id: Option<EntityId>) -> Self {
        self.target_id = target_id;
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn snapshots(mut self, original: Attributes, changes: Attributes) -> Self {
        self.original = original;
        self.changes = changes;
        self
    }

    /// Mark the event failed with the error that rolled the action back.
    pub fn failed(mut self, exception: impl Into<String>) -> Self {
        self.status = ActionStatus::Failed;
        self.exception = Some(exception.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }
}
