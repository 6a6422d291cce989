//! Memory orchestration façade.

use crate::cache::LocalCache;
use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::events::{ListenerId, MemoryEventBus};
use crate::preferences::{PREFERENCE_CONTENT_PREFIX, parse_preference};
use chrono::Utc;
use engram_protocol::{
    AgentMemoryContext, ErrorRecord, Learning, MemoryCategory, MemoryEntry, MemoryEvent,
    MemoryEventKind, MemoryMetadata, MemoryMetadataDraft, MemoryOperationResult,
    MemorySearchParams, MemorySearchResult, MemoryStats, TaskContext,
};
use engram_store::{HttpMemoryService, MemoryService, RemoteStore, ScopeResolver};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Default limit for category-scoped retrieval.
const DEFAULT_CATEGORY_LIMIT: usize = 20;
/// Default limit for recent-memory retrieval.
const DEFAULT_RECENT_LIMIT: usize = 10;
/// Scan bound when folding task context.
const TASK_CONTEXT_SCAN_LIMIT: usize = 50;
/// Scan bound when clearing a tab.
const TAB_CLEAR_SCAN_LIMIT: usize = 100;
/// Scan bound when computing statistics.
const STATS_SCAN_LIMIT: usize = 1000;
/// Recent entries folded into agent context.
const AGENT_CONTEXT_WINDOW: usize = 20;

/// Central façade for the memory subsystem.
///
/// Completes metadata with the owning agent and session, performs
/// write-through writes, degrades reads to empty results on failure, folds
/// query results into derived views, and publishes lifecycle events.
pub struct MemoryOrchestrator {
    config: MemoryConfig,
    store: Option<RemoteStore>,
    events: MemoryEventBus,
    cache: LocalCache,
    agent_id: String,
    session_id: String,
    disabled_reason: Option<String>,
}

impl MemoryOrchestrator {
    /// Orchestrator backed by the hosted service named in the config.
    ///
    /// A config that enables memory without a usable credential degrades the
    /// subsystem to disabled instead of erroring at call time.
    pub fn from_config(config: MemoryConfig, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        if !config.enabled {
            return Self::assemble(config, None, agent_id, None);
        }
        match config.api_key.clone() {
            Some(api_key) => match HttpMemoryService::new(&api_key) {
                Ok(service) => {
                    let store = RemoteStore::new(Arc::new(service));
                    Self::assemble(config, Some(store), agent_id, None)
                }
                Err(err) => {
                    let reason = format!("failed to construct memory service: {err}");
                    warn!("memory subsystem disabled ({reason})");
                    Self::assemble(config, None, agent_id, Some(reason))
                }
            },
            None => {
                let reason = "memory enabled but no api key is configured".to_string();
                warn!("memory subsystem disabled ({reason})");
                Self::assemble(config, None, agent_id, Some(reason))
            }
        }
    }

    /// Orchestrator over an explicit service implementation.
    pub fn with_service(
        config: MemoryConfig,
        service: Arc<dyn MemoryService>,
        agent_id: impl Into<String>,
    ) -> Self {
        let store = RemoteStore::new(service);
        Self::assemble(config, Some(store), agent_id.into(), None)
    }

    /// Orchestrator over an explicit service and scope resolver.
    pub fn with_service_and_scopes(
        config: MemoryConfig,
        service: Arc<dyn MemoryService>,
        scopes: Arc<dyn ScopeResolver>,
        agent_id: impl Into<String>,
    ) -> Self {
        let store = RemoteStore::with_scope_resolver(service, scopes);
        Self::assemble(config, Some(store), agent_id.into(), None)
    }

    fn assemble(
        config: MemoryConfig,
        store: Option<RemoteStore>,
        agent_id: String,
        disabled_reason: Option<String>,
    ) -> Self {
        let cache = LocalCache::new(config.max_entries, config.retention_days);
        let session_id = Uuid::new_v4().to_string();
        info!(
            "memory orchestrator ready (agent={agent_id}, enabled={}, max_entries={}, retention_days={})",
            config.enabled && store.is_some() && disabled_reason.is_none(),
            config.max_entries,
            config.retention_days
        );
        Self {
            config,
            store,
            events: MemoryEventBus::new(),
            cache,
            agent_id,
            session_id,
            disabled_reason,
        }
    }

    fn active_store(&self) -> Option<&RemoteStore> {
        if !self.config.enabled || self.disabled_reason.is_some() {
            return None;
        }
        self.store.as_ref()
    }

    /// Whether operations will attempt remote calls.
    pub fn is_enabled(&self) -> bool {
        self.active_store().is_some()
    }

    /// Why the subsystem disabled itself at construction, if it did.
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subsystem configuration in effect.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Lifecycle event bus for subscribing collaborators.
    pub fn events(&self) -> &MemoryEventBus {
        &self.events
    }

    /// Convenience global subscription to lifecycle events.
    pub fn on_memory_event(
        &self,
        listener: impl Fn(&MemoryEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.subscribe(listener)
    }

    /// O(1) lookup of an already-seen entry.
    pub fn cached(&self, id: &str) -> Option<MemoryEntry> {
        self.cache.get(id)
    }

    /// Count of locally mirrored entries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Verify remote connectivity.
    ///
    /// A configuration problem detected at construction surfaces here; a
    /// deliberately disabled subsystem is a no-op success.
    pub async fn initialize(&self) -> Result<(), MemoryError> {
        if let Some(reason) = &self.disabled_reason {
            return Err(MemoryError::Configuration(reason.clone()));
        }
        let Some(store) = self.active_store() else {
            return Ok(());
        };
        store.initialize().await?;
        info!("memory orchestrator initialized (agent={})", self.agent_id);
        Ok(())
    }

    /// Complete caller-supplied metadata with the owning agent and session.
    fn complete_metadata(&self, draft: MemoryMetadataDraft) -> MemoryMetadata {
        MemoryMetadata {
            agent_id: self.agent_id.clone(),
            session_id: draft.session_id.or_else(|| Some(self.session_id.clone())),
            task_id: draft.task_id,
            category: draft.category,
            tags: draft.tags,
            importance: draft.importance,
            tab_id: draft.tab_id,
            url: draft.url,
            site: draft.site,
            tool_name: draft.tool_name,
            expires_at: draft.expires_at,
        }
    }

    /// Persist content with completed metadata, write-through to the cache.
    pub async fn add_memory(
        &self,
        content: &str,
        draft: MemoryMetadataDraft,
    ) -> MemoryOperationResult {
        let Some(store) = self.active_store() else {
            return MemoryOperationResult::failed("memory is disabled");
        };
        let metadata = self.complete_metadata(draft);
        match store.add(content, &metadata).await {
            Ok(mut entry) => {
                if entry.id.is_empty() {
                    entry.id = Uuid::new_v4().to_string();
                }
                self.cache.insert(entry.clone());
                self.events.emit(&MemoryEvent {
                    kind: MemoryEventKind::Added,
                    entry_id: Some(entry.id.clone()),
                    category: entry.metadata.category,
                    agent_id: self.agent_id.clone(),
                    tab_id: entry.metadata.tab_id,
                    timestamp: Utc::now(),
                });
                MemoryOperationResult::succeeded(entry)
            }
            Err(err) => MemoryOperationResult::failed(format!("failed to add memory: {err}")),
        }
    }

    /// Search; failures degrade to the empty result so callers can proceed
    /// without memory rather than stall.
    pub async fn search_memories(&self, mut params: MemorySearchParams) -> MemorySearchResult {
        let Some(store) = self.active_store() else {
            return MemorySearchResult::empty();
        };
        if params.agent_id.is_none() {
            params.agent_id = Some(self.agent_id.clone());
        }
        match store.search(&params).await {
            Ok(result) => {
                for entry in &result.entries {
                    self.cache.insert(entry.clone());
                }
                self.events.emit(&MemoryEvent {
                    kind: MemoryEventKind::Searched,
                    entry_id: None,
                    category: params.category,
                    agent_id: self.agent_id.clone(),
                    tab_id: params.tab_id,
                    timestamp: Utc::now(),
                });
                result
            }
            Err(err) => {
                warn!("memory search failed, returning empty result ({err})");
                MemorySearchResult::empty()
            }
        }
    }

    /// Entries in a category, newest-first ordering left to the store.
    pub async fn get_memories_by_category(
        &self,
        category: MemoryCategory,
        limit: Option<usize>,
    ) -> Vec<MemoryEntry> {
        let params = MemorySearchParams {
            category: Some(category),
            limit: Some(limit.unwrap_or(DEFAULT_CATEGORY_LIMIT)),
            ..MemorySearchParams::new("")
        };
        self.search_memories(params).await.entries
    }

    /// Most recent entries, newest first.
    pub async fn get_recent_memories(&self, limit: Option<usize>) -> Vec<MemoryEntry> {
        let Some(store) = self.active_store() else {
            return Vec::new();
        };
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        match store.get_all(&self.agent_id, limit).await {
            Ok(result) => {
                let mut entries = result.entries;
                for entry in &entries {
                    self.cache.insert(entry.clone());
                }
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                entries.truncate(limit);
                entries
            }
            Err(err) => {
                warn!("failed to get recent memories ({err})");
                Vec::new()
            }
        }
    }

    /// Fold entries sharing a task id into a context view.
    ///
    /// Returns absence, not an empty context, on zero matches or failure.
    pub async fn get_task_context(&self, task_id: &str) -> Option<TaskContext> {
        let params = MemorySearchParams {
            task_id: Some(task_id.to_string()),
            limit: Some(TASK_CONTEXT_SCAN_LIMIT),
            ..MemorySearchParams::new("")
        };
        let result = self.search_memories(params).await;
        if result.entries.is_empty() {
            return None;
        }
        let mut context = TaskContext::new(task_id);
        for entry in &result.entries {
            fold_task_entry(&mut context, entry);
        }
        Some(context)
    }

    /// Record a workflow pattern; successful patterns rank higher.
    pub async fn store_workflow_pattern(
        &self,
        pattern: &str,
        success: bool,
        draft: MemoryMetadataDraft,
    ) -> MemoryOperationResult {
        let draft = MemoryMetadataDraft {
            category: Some(MemoryCategory::WorkflowPattern),
            importance: Some(if success { 0.8 } else { 0.3 }),
            ..draft
        };
        self.add_memory(pattern, draft).await
    }

    /// Record a tool invocation result for future reference.
    pub async fn store_tool_result(
        &self,
        tool_name: &str,
        result: &Value,
        success: bool,
        draft: MemoryMetadataDraft,
    ) -> MemoryOperationResult {
        let content = format!("Tool: {tool_name}, Success: {success}, Result: {result}");
        let draft = MemoryMetadataDraft {
            category: Some(MemoryCategory::ToolResult),
            tool_name: Some(tool_name.to_string()),
            importance: Some(if success { 0.6 } else { 0.4 }),
            ..draft
        };
        self.add_memory(&content, draft).await
    }

    /// Record a user preference as a key plus JSON value.
    pub async fn store_user_preference(
        &self,
        key: &str,
        value: &Value,
        draft: MemoryMetadataDraft,
    ) -> MemoryOperationResult {
        let content = format!("{PREFERENCE_CONTENT_PREFIX}{key} = {value}");
        let draft = MemoryMetadataDraft {
            category: Some(MemoryCategory::UserPreference),
            importance: Some(0.9),
            ..draft
        };
        self.add_memory(&content, draft).await
    }

    /// Best-effort coordination context folded from recent memories.
    ///
    /// Never fails; a degraded read simply yields fewer folded fields.
    pub async fn get_agent_context(&self) -> AgentMemoryContext {
        let recent = self.get_recent_memories(Some(AGENT_CONTEXT_WINDOW)).await;
        let mut context = AgentMemoryContext {
            agent_id: self.agent_id.clone(),
            session_id: self.session_id.clone(),
            active_task_id: None,
            last_activity: Utc::now(),
            preferences: Map::new(),
            learnings: Vec::new(),
        };
        for entry in &recent {
            fold_agent_entry(&mut context, entry);
        }
        context
    }

    /// Replace an entry's content; metadata is unchanged.
    pub async fn update_memory(&self, id: &str, content: &str) -> MemoryOperationResult {
        let Some(store) = self.active_store() else {
            return MemoryOperationResult::failed("memory is disabled");
        };
        if id.is_empty() {
            return MemoryOperationResult::failed("cannot update an entry that was never persisted");
        }
        match store.update(id, content).await {
            Ok(()) => {
                if let Some(mut entry) = self.cache.get(id) {
                    entry.content = content.to_string();
                    entry.updated_at = Utc::now();
                    self.cache.insert(entry);
                }
                self.events.emit(&MemoryEvent {
                    kind: MemoryEventKind::Updated,
                    entry_id: Some(id.to_string()),
                    category: None,
                    agent_id: self.agent_id.clone(),
                    tab_id: None,
                    timestamp: Utc::now(),
                });
                MemoryOperationResult::succeeded_with_message("memory updated")
            }
            Err(err) => MemoryOperationResult::failed(format!("failed to update memory: {err}")),
        }
    }

    /// Delete every entry recorded against a tab, tolerating partial failure.
    ///
    /// Reports only the count actually deleted.
    pub async fn clear_tab_memories(&self, tab_id: i64) -> MemoryOperationResult {
        let Some(store) = self.active_store() else {
            return MemoryOperationResult::failed("memory is disabled");
        };
        let params = MemorySearchParams {
            tab_id: Some(tab_id),
            limit: Some(TAB_CLEAR_SCAN_LIMIT),
            ..MemorySearchParams::new("")
        };
        let matches = self.search_memories(params).await;
        let mut deleted = 0usize;
        for entry in &matches.entries {
            match store.delete(&entry.id, &self.agent_id).await {
                Ok(()) => {
                    deleted += 1;
                    self.cache.remove(&entry.id);
                    self.events.emit(&MemoryEvent {
                        kind: MemoryEventKind::Deleted,
                        entry_id: Some(entry.id.clone()),
                        category: entry.metadata.category,
                        agent_id: self.agent_id.clone(),
                        tab_id: Some(tab_id),
                        timestamp: Utc::now(),
                    });
                }
                Err(err) => {
                    warn!("failed to delete memory (id={}, {err})", entry.id);
                }
            }
        }
        debug!("cleared tab memories (tab={tab_id}, deleted={deleted})");
        MemoryOperationResult::succeeded_with_message(format!(
            "deleted {deleted} memories for tab {tab_id}"
        ))
    }

    /// Aggregate per-category and per-tab statistics.
    ///
    /// Never fails; errors yield the zero-seeded stats object.
    pub async fn get_memory_stats(&self) -> MemoryStats {
        let Some(store) = self.active_store() else {
            return MemoryStats::seeded();
        };
        match store.get_all(&self.agent_id, STATS_SCAN_LIMIT).await {
            Ok(result) => {
                let mut stats = MemoryStats::seeded();
                stats.total_entries = result.total;
                let mut tabs = BTreeSet::new();
                for entry in &result.entries {
                    self.cache.insert(entry.clone());
                    if let Some(category) = entry.metadata.category {
                        *stats.entries_by_category.entry(category).or_insert(0) += 1;
                    }
                    if let Some(tab_id) = entry.metadata.tab_id {
                        tabs.insert(tab_id);
                    }
                }
                stats.tab_count = tabs.len();
                stats.last_updated = Some(Utc::now());
                stats
            }
            Err(err) => {
                warn!("failed to compute memory stats ({err})");
                MemoryStats::seeded()
            }
        }
    }
}

/// Fold one entry into a task context, dispatching on its category.
fn fold_task_entry(context: &mut TaskContext, entry: &MemoryEntry) {
    let Some(category) = entry.metadata.category else {
        return;
    };
    match category {
        MemoryCategory::TaskResult => {
            context
                .intermediate_results
                .insert(entry.id.clone(), entry.content.clone());
        }
        MemoryCategory::UserPreference => match parse_preference(&entry.content) {
            Ok(preferences) => context.user_preferences.extend(preferences),
            Err(err) => {
                debug!("skipping malformed preference entry (id={}, {err})", entry.id);
            }
        },
        MemoryCategory::ErrorSolution => {
            // The stored content stands in for both sides of the pair.
            context.error_history.push(ErrorRecord {
                error: entry.content.clone(),
                solution: entry.content.clone(),
                timestamp: entry.created_at,
            });
        }
        MemoryCategory::WorkflowPattern
        | MemoryCategory::SearchResult
        | MemoryCategory::InteractionPattern
        | MemoryCategory::ResearchData
        | MemoryCategory::SuccessfulPlan
        | MemoryCategory::ToolResult
        | MemoryCategory::ContextData => {}
    }
}

/// Fold one entry into the agent context, dispatching on its category.
fn fold_agent_entry(context: &mut AgentMemoryContext, entry: &MemoryEntry) {
    let Some(category) = entry.metadata.category else {
        return;
    };
    match category {
        MemoryCategory::UserPreference => match parse_preference(&entry.content) {
            Ok(preferences) => context.preferences.extend(preferences),
            Err(err) => {
                debug!("skipping malformed preference entry (id={}, {err})", entry.id);
            }
        },
        MemoryCategory::WorkflowPattern => {
            let importance = entry.metadata.importance;
            context.learnings.push(Learning {
                pattern: entry.content.clone(),
                success: importance.unwrap_or(0.0) > 0.5,
                confidence: importance.unwrap_or(0.5),
            });
        }
        MemoryCategory::TaskResult
        | MemoryCategory::SearchResult
        | MemoryCategory::InteractionPattern
        | MemoryCategory::ErrorSolution
        | MemoryCategory::ResearchData
        | MemoryCategory::SuccessfulPlan
        | MemoryCategory::ToolResult
        | MemoryCategory::ContextData => {}
    }
}
