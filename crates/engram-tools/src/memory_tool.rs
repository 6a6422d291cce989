//! Memory tool: typed operation requests over the orchestrator.

use engram_core::{MemoryOrchestrator, parse_preference};
use engram_protocol::{MemoryCategory, MemoryMetadataDraft, MemorySearchParams, PageLocation};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Importance assigned to stored task results when the caller names none.
const DEFAULT_RESULT_IMPORTANCE: f64 = 0.7;
/// Preference entries folded by `get_preferences`.
const PREFERENCES_LIMIT: usize = 20;
/// Error-history entries included in a context payload.
const ERROR_HISTORY_LIMIT: usize = 5;
/// Characters of stored content echoed back in confirmations.
const CONFIRMATION_PREVIEW_CHARS: usize = 100;

/// A well-typed operation request received from the tool framework.
///
/// Schema validation and argument parsing happen upstream; required fields
/// are still optional here so a missing one is reported as a validation
/// failure before any remote call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MemoryToolRequest {
    /// Store free-form content.
    Add {
        content: Option<String>,
        #[serde(default)]
        category: Option<MemoryCategory>,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        importance: Option<f64>,
    },
    /// Search stored entries.
    Search {
        query: Option<String>,
        #[serde(default)]
        category: Option<MemoryCategory>,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Reconstruct the context of a task.
    GetContext {
        task_id: Option<String>,
    },
    /// Store a task result.
    StoreResult {
        content: Option<String>,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        importance: Option<f64>,
    },
    /// Fold stored user preferences into one object.
    GetPreferences,
}

/// JSON-encodable response envelope; `ok = false` always carries an error.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryToolResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MemoryToolResponse {
    fn success(output: Value) -> Self {
        Self {
            ok: true,
            output: Some(output),
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            output: None,
            error: Some(message.into()),
        }
    }
}

/// Stores and retrieves information across tasks, tabs, and sessions.
pub struct MemoryTool {
    orchestrator: Arc<MemoryOrchestrator>,
}

impl MemoryTool {
    pub fn new(orchestrator: Arc<MemoryOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Execute one request; never raises past this boundary.
    ///
    /// The location descriptor, when present, enriches stored metadata with
    /// the tab id, URL, and derived site, and pins searches to the tab.
    pub async fn call(
        &self,
        request: MemoryToolRequest,
        location: Option<&PageLocation>,
    ) -> MemoryToolResponse {
        match request {
            MemoryToolRequest::Add {
                content,
                category,
                task_id,
                tags,
                importance,
            } => {
                let Some(content) = content.filter(|content| !content.is_empty()) else {
                    return MemoryToolResponse::failure("content is required for the add action");
                };
                let mut draft = base_draft(location, task_id, tags, importance);
                draft.category = category;
                let result = self.orchestrator.add_memory(&content, draft).await;
                if result.success {
                    MemoryToolResponse::success(json!({
                        "message": format!(
                            "memory stored: {}",
                            preview(&content, CONFIRMATION_PREVIEW_CHARS)
                        ),
                    }))
                } else {
                    MemoryToolResponse::failure(
                        result
                            .message
                            .unwrap_or_else(|| "failed to add memory".to_string()),
                    )
                }
            }
            MemoryToolRequest::Search {
                query,
                category,
                task_id,
                limit,
            } => {
                let Some(query) = query.filter(|query| !query.is_empty()) else {
                    return MemoryToolResponse::failure("query is required for the search action");
                };
                let params = MemorySearchParams {
                    query: query.clone(),
                    category,
                    task_id,
                    tab_id: location.map(|location| location.tab_id),
                    limit,
                    ..MemorySearchParams::default()
                };
                let result = self.orchestrator.search_memories(params).await;
                let memories: Vec<Value> = result
                    .entries
                    .iter()
                    .map(|entry| {
                        json!({
                            "content": entry.content,
                            "category": entry.metadata.category,
                            "created": entry.created_at.to_rfc3339(),
                            "importance": entry.metadata.importance,
                            "tags": entry.metadata.tags,
                        })
                    })
                    .collect();
                MemoryToolResponse::success(json!({
                    "memories": memories,
                    "total": result.total,
                    "query": query,
                }))
            }
            MemoryToolRequest::GetContext { task_id } => {
                let Some(task_id) = task_id.filter(|task_id| !task_id.is_empty()) else {
                    return MemoryToolResponse::failure(
                        "task id is required for the get_context action",
                    );
                };
                match self.orchestrator.get_task_context(&task_id).await {
                    Some(context) => MemoryToolResponse::success(json!({
                        "task_id": context.task_id,
                        "intermediate_results": context.intermediate_results,
                        "user_preferences": context.user_preferences,
                        "error_history": context
                            .error_history
                            .iter()
                            .take(ERROR_HISTORY_LIMIT)
                            .collect::<Vec<_>>(),
                    })),
                    None => MemoryToolResponse::success(json!({
                        "message": "no context found for task",
                    })),
                }
            }
            MemoryToolRequest::StoreResult {
                content,
                task_id,
                tags,
                importance,
            } => {
                let Some(content) = content.filter(|content| !content.is_empty()) else {
                    return MemoryToolResponse::failure(
                        "content is required for the store_result action",
                    );
                };
                let mut draft = base_draft(
                    location,
                    task_id,
                    tags,
                    importance.or(Some(DEFAULT_RESULT_IMPORTANCE)),
                );
                draft.category = Some(MemoryCategory::TaskResult);
                let result = self.orchestrator.add_memory(&content, draft).await;
                if result.success {
                    MemoryToolResponse::success(json!({ "message": "task result stored" }))
                } else {
                    MemoryToolResponse::failure(
                        result
                            .message
                            .unwrap_or_else(|| "failed to store task result".to_string()),
                    )
                }
            }
            MemoryToolRequest::GetPreferences => {
                let entries = self
                    .orchestrator
                    .get_memories_by_category(
                        MemoryCategory::UserPreference,
                        Some(PREFERENCES_LIMIT),
                    )
                    .await;
                let mut preferences = Map::new();
                for entry in &entries {
                    match parse_preference(&entry.content) {
                        Ok(parsed) => preferences.extend(parsed),
                        Err(err) => {
                            debug!("skipping malformed preference entry (id={}, {err})", entry.id);
                        }
                    }
                }
                MemoryToolResponse::success(json!({
                    "preferences": Value::Object(preferences),
                    "count": entries.len(),
                }))
            }
        }
    }
}

/// Metadata draft shared by the write actions.
fn base_draft(
    location: Option<&PageLocation>,
    task_id: Option<String>,
    tags: Vec<String>,
    importance: Option<f64>,
) -> MemoryMetadataDraft {
    let draft = MemoryMetadataDraft {
        task_id,
        tags,
        importance,
        ..MemoryMetadataDraft::default()
    };
    match location {
        Some(location) => draft.with_location(location),
        None => draft,
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
