//! Derived, non-persisted views folded from entries at query time.

use crate::entry::MemoryCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An error observed during a task and what resolved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
    pub solution: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregation of entries sharing a task identifier.
///
/// Has no lifecycle beyond the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub task_id: String,
    pub current_step: u32,
    pub total_steps: u32,
    /// Task-result contents keyed by entry id.
    pub intermediate_results: BTreeMap<String, String>,
    /// Merged user preference objects.
    pub user_preferences: Map<String, Value>,
    /// Error/solution pairs in scan order.
    pub error_history: Vec<ErrorRecord>,
}

impl TaskContext {
    /// An empty context for the given task.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            current_step: 0,
            total_steps: 0,
            intermediate_results: BTreeMap::new(),
            user_preferences: Map::new(),
            error_history: Vec::new(),
        }
    }
}

/// A learned workflow pattern with its observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub pattern: String,
    pub success: bool,
    pub confidence: f64,
}

/// Best-effort coordination context for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMemoryContext {
    pub agent_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<String>,
    pub last_activity: DateTime<Utc>,
    /// Merged user preference objects.
    pub preferences: Map<String, Value>,
    /// Learnings folded from workflow patterns.
    pub learnings: Vec<Learning>,
}

/// Aggregate statistics over an agent's stored entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_entries: usize,
    /// Per-category counts; every category is always present.
    pub entries_by_category: BTreeMap<MemoryCategory, usize>,
    /// Count of distinct tab ids observed.
    pub tab_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MemoryStats {
    /// Stats with every category seeded at zero.
    pub fn seeded() -> Self {
        Self {
            total_entries: 0,
            entries_by_category: MemoryCategory::ALL
                .into_iter()
                .map(|category| (category, 0))
                .collect(),
            tab_count: 0,
            last_updated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStats;
    use crate::entry::MemoryCategory;
    use pretty_assertions::assert_eq;

    #[test]
    fn seeded_stats_cover_every_category() {
        let stats = MemoryStats::seeded();
        assert_eq!(stats.entries_by_category.len(), MemoryCategory::ALL.len());
        assert!(stats.entries_by_category.values().all(|count| *count == 0));
    }
}
