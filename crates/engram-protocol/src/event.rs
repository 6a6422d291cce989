//! Lifecycle events published by the orchestrator.

use crate::entry::MemoryCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryEventKind {
    /// An entry was persisted and cached.
    Added,
    /// A search was issued.
    Searched,
    /// An entry's content was replaced.
    Updated,
    /// An entry was deleted.
    Deleted,
}

impl MemoryEventKind {
    /// Wire name for the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryEventKind::Added => "memory_added",
            MemoryEventKind::Searched => "memory_searched",
            MemoryEventKind::Updated => "memory_updated",
            MemoryEventKind::Deleted => "memory_deleted",
        }
    }
}

/// A single lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub kind: MemoryEventKind,
    /// Entry the event refers to, when the operation targets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MemoryCategory>,
    /// Agent whose scope the operation ran under.
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}
