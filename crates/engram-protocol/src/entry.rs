//! Memory entry and metadata model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of categories that drive retrieval and context folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Intermediate or final result of a task step.
    TaskResult,
    /// A stored user preference, content is a JSON object or key/value form.
    UserPreference,
    /// A workflow that succeeded or failed, used for learning.
    WorkflowPattern,
    /// Raw search output worth keeping.
    SearchResult,
    /// Observed interaction pattern.
    InteractionPattern,
    /// An error together with what resolved it.
    ErrorSolution,
    /// Collected research material.
    ResearchData,
    /// A plan that completed successfully.
    SuccessfulPlan,
    /// Output of a tool invocation.
    ToolResult,
    /// Ambient context data.
    ContextData,
}

impl MemoryCategory {
    /// Every category, in declaration order.
    pub const ALL: [MemoryCategory; 10] = [
        MemoryCategory::TaskResult,
        MemoryCategory::UserPreference,
        MemoryCategory::WorkflowPattern,
        MemoryCategory::SearchResult,
        MemoryCategory::InteractionPattern,
        MemoryCategory::ErrorSolution,
        MemoryCategory::ResearchData,
        MemoryCategory::SuccessfulPlan,
        MemoryCategory::ToolResult,
        MemoryCategory::ContextData,
    ];

    /// Wire name for the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::TaskResult => "task_result",
            MemoryCategory::UserPreference => "user_preference",
            MemoryCategory::WorkflowPattern => "workflow_pattern",
            MemoryCategory::SearchResult => "search_result",
            MemoryCategory::InteractionPattern => "interaction_pattern",
            MemoryCategory::ErrorSolution => "error_solution",
            MemoryCategory::ResearchData => "research_data",
            MemoryCategory::SuccessfulPlan => "successful_plan",
            MemoryCategory::ToolResult => "tool_result",
            MemoryCategory::ContextData => "context_data",
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown memory category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for MemoryCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MemoryCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

/// Attributes attached to every memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Logical owner; the remote scope identity is derived from this.
    pub agent_id: String,
    /// Session the entry was captured in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Task the entry correlates to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Category driving retrieval and folding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MemoryCategory>,
    /// Free-form tags; order preserved for display only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Importance in [0, 1]; >= 0.7 is treated as critical by storing code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    /// Browser tab the entry originated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    /// Source page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source site (URL host component).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Tool that produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Advisory expiry; retention is not enforced remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryMetadata {
    /// Metadata owned by the given agent with everything else unset.
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: None,
            task_id: None,
            category: None,
            tags: Vec::new(),
            importance: None,
            tab_id: None,
            url: None,
            site: None,
            tool_name: None,
            expires_at: None,
        }
    }
}

/// Caller-suppliable metadata subset.
///
/// Has no `agent_id` field: scoping identity is always completed by the
/// orchestrator, never taken from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadataDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MemoryCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryMetadataDraft {
    /// Merge the current page location into the draft, deriving the site.
    pub fn with_location(mut self, location: &PageLocation) -> Self {
        self.tab_id = Some(location.tab_id);
        self.url = Some(location.url.clone());
        self.site = location.site();
        self
    }
}

/// The durable unit: content plus metadata.
///
/// Entries are only materialized after a successful remote write, so `id`
/// is always a non-empty store-assigned (or generated fallback) identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Opaque identifier assigned on first successful write.
    pub id: String,
    /// Free-text payload.
    pub content: String,
    /// Attached metadata.
    pub metadata: MemoryMetadata,
    /// First local construction time (client clock).
    pub created_at: DateTime<Utc>,
    /// Last explicit update; equals `created_at` until one happens.
    pub updated_at: DateTime<Utc>,
}

/// Opaque current-location descriptor from the browsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLocation {
    /// Tab identifier.
    pub tab_id: i64,
    /// Page URL.
    pub url: String,
}

impl PageLocation {
    /// Host component of the URL, if one can be extracted.
    pub fn site(&self) -> Option<String> {
        let (_, rest) = self.url.split_once("://")?;
        let authority = rest.split(['/', '?', '#']).next()?;
        let authority = match authority.rsplit_once('@') {
            Some((_, host)) => host,
            None => authority,
        };
        let host = authority.split(':').next()?;
        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }
}
