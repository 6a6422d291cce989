//! Search parameters and operation result shapes.

use crate::entry::{MemoryCategory, MemoryEntry};
use serde::{Deserialize, Serialize};

/// Limit applied when a search request does not name one.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Parameters for a memory search.
///
/// Only `query` is required; unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySearchParams {
    /// Free-text query; an empty query matches all entries in scope.
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MemoryCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Maximum entries to return; defaults to [`DEFAULT_SEARCH_LIMIT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl MemorySearchParams {
    /// Search params with the given query and all filters unset.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The effective limit for this request.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

/// Result of a memory search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySearchResult {
    /// Matched entries, at most the requested limit.
    pub entries: Vec<MemoryEntry>,
    /// Count of entries returned.
    pub total: usize,
    /// True when the returned count equals the requested limit.
    ///
    /// An approximation, not a cursor: over-reports when the match set lands
    /// exactly on the limit boundary.
    pub has_more: bool,
}

impl MemorySearchResult {
    /// The empty result, used when reads degrade on failure.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Outcome of a single write-path operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryOperationResult {
    /// Whether the operation took effect.
    pub success: bool,
    /// Human-readable outcome description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The entry the operation produced, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<MemoryEntry>,
}

impl MemoryOperationResult {
    /// Successful outcome carrying the produced entry.
    pub fn succeeded(entry: MemoryEntry) -> Self {
        Self {
            success: true,
            message: None,
            entry: Some(entry),
        }
    }

    /// Successful outcome with a description only.
    pub fn succeeded_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            entry: None,
        }
    }

    /// Failed outcome with a description.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            entry: None,
        }
    }
}
