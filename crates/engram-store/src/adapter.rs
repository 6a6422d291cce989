//! Entry-level adapter translating memory operations into service records.

use crate::error::StoreError;
use crate::scope::{FALLBACK_AGENT_ID, PrefixScopeResolver, ScopeResolver};
use crate::service::{MemoryService, ServiceRecord};
use chrono::{DateTime, Utc};
use engram_protocol::{
    MemoryCategory, MemoryEntry, MemoryMetadata, MemorySearchParams, MemorySearchResult,
};
use log::{debug, info};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Adapter over a remote memory service.
///
/// Owns session bootstrap (lazy connectivity probe), metadata
/// stringification, and the reverse transformation of remote records into
/// [`MemoryEntry`] values. Holds no cache and no business logic.
pub struct RemoteStore {
    service: Arc<dyn MemoryService>,
    scopes: Arc<dyn ScopeResolver>,
    init: OnceCell<()>,
}

impl RemoteStore {
    /// Adapter with the default prefix scope resolver.
    pub fn new(service: Arc<dyn MemoryService>) -> Self {
        Self::with_scope_resolver(service, Arc::new(PrefixScopeResolver::default()))
    }

    /// Adapter with an injected scope resolver.
    pub fn with_scope_resolver(
        service: Arc<dyn MemoryService>,
        scopes: Arc<dyn ScopeResolver>,
    ) -> Self {
        Self {
            service,
            scopes,
            init: OnceCell::new(),
        }
    }

    /// Verify connectivity and auth by issuing a harmless probe query.
    ///
    /// Idempotent: a successful probe is never repeated, a failed one is
    /// retried on the next call.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.init
            .get_or_try_init(|| async {
                self.service
                    .probe()
                    .await
                    .map_err(|err| StoreError::Connectivity(format!("probe failed: {err}")))?;
                info!("remote store initialized");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    /// Persist content under the scope derived from the metadata owner.
    pub async fn add(
        &self,
        content: &str,
        metadata: &MemoryMetadata,
    ) -> Result<MemoryEntry, StoreError> {
        self.initialize().await?;
        let now = Utc::now();
        let record = ServiceRecord {
            id: None,
            scope_id: self.scopes.scope_id(&metadata.agent_id),
            body: content.to_string(),
            metadata: encode_metadata(metadata, now),
            updated_at: None,
        };
        let id = self.service.add(record).await?;
        debug!("added memory (id={id}, agent={})", metadata.agent_id);
        Ok(MemoryEntry {
            id,
            content: content.to_string(),
            metadata: metadata.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Search the owning agent's scope.
    pub async fn search(
        &self,
        params: &MemorySearchParams,
    ) -> Result<MemorySearchResult, StoreError> {
        self.initialize().await?;
        let agent_id = params.agent_id.as_deref().unwrap_or(FALLBACK_AGENT_ID);
        let scope_id = self.scopes.scope_id(agent_id);
        let limit = params.effective_limit();
        let filters = search_filters(params);
        let records = self
            .service
            .search(&scope_id, &params.query, limit, &filters)
            .await?;
        debug!(
            "search returned (agent={agent_id}, records={}, limit={limit})",
            records.len()
        );
        Ok(self.into_result(records, limit))
    }

    /// Replace an entry's content; metadata is left unchanged.
    pub async fn update(&self, id: &str, content: &str) -> Result<(), StoreError> {
        self.initialize().await?;
        self.service.update(id, content).await
    }

    /// Delete an entry by id. The agent id is diagnostic only.
    pub async fn delete(&self, id: &str, agent_id: &str) -> Result<(), StoreError> {
        self.initialize().await?;
        debug!("deleting memory (id={id}, agent={agent_id})");
        self.service.delete(id).await
    }

    /// List a scope without query filtering, same result shape as search.
    pub async fn get_all(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<MemorySearchResult, StoreError> {
        self.initialize().await?;
        let scope_id = self.scopes.scope_id(agent_id);
        let records = self.service.list(&scope_id, limit).await?;
        Ok(self.into_result(records, limit))
    }

    fn into_result(&self, records: Vec<ServiceRecord>, limit: usize) -> MemorySearchResult {
        let total = records.len();
        let has_more = total == limit;
        let entries = records
            .into_iter()
            .map(|record| self.decode_record(record))
            .collect();
        MemorySearchResult {
            entries,
            total,
            has_more,
        }
    }

    /// Reconstruct an entry from a remote record.
    ///
    /// A parse failure on any single field omits that field rather than
    /// failing the record; missing timestamps default to now.
    fn decode_record(&self, record: ServiceRecord) -> MemoryEntry {
        let meta = &record.metadata;
        let category = meta
            .get("category")
            .and_then(|raw| match MemoryCategory::from_str(raw) {
                Ok(category) => Some(category),
                Err(err) => {
                    debug!("dropping unparseable category field ({err})");
                    None
                }
            });
        let tags = meta
            .get("tags")
            .map(|raw| {
                raw.split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let metadata = MemoryMetadata {
            agent_id: self.scopes.agent_id(&record.scope_id),
            session_id: meta.get("session_id").cloned(),
            task_id: meta.get("task_id").cloned(),
            category,
            tags,
            importance: meta.get("importance").and_then(|raw| raw.parse().ok()),
            tab_id: meta.get("tab_id").and_then(|raw| raw.parse().ok()),
            url: meta.get("url").cloned(),
            site: meta.get("site").cloned(),
            tool_name: meta.get("tool_name").cloned(),
            expires_at: meta.get("expires_at").and_then(|raw| parse_timestamp(raw)),
        };
        MemoryEntry {
            id: record.id.unwrap_or_default(),
            content: record.body,
            metadata,
            created_at: meta
                .get("created_at")
                .and_then(|raw| parse_timestamp(raw))
                .unwrap_or_else(Utc::now),
            updated_at: record.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Stringify metadata into the flat map the service transmits.
fn encode_metadata(metadata: &MemoryMetadata, now: DateTime<Utc>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(tab_id) = metadata.tab_id {
        map.insert("tab_id".to_string(), tab_id.to_string());
    }
    if let Some(task_id) = &metadata.task_id {
        map.insert("task_id".to_string(), task_id.clone());
    }
    if let Some(category) = metadata.category {
        map.insert("category".to_string(), category.as_str().to_string());
    }
    if !metadata.tags.is_empty() {
        map.insert("tags".to_string(), metadata.tags.join(","));
    }
    if let Some(importance) = metadata.importance {
        map.insert("importance".to_string(), importance.to_string());
    }
    if let Some(url) = &metadata.url {
        map.insert("url".to_string(), url.clone());
    }
    if let Some(site) = &metadata.site {
        map.insert("site".to_string(), site.clone());
    }
    if let Some(tool_name) = &metadata.tool_name {
        map.insert("tool_name".to_string(), tool_name.clone());
    }
    if let Some(session_id) = &metadata.session_id {
        map.insert("session_id".to_string(), session_id.clone());
    }
    if let Some(expires_at) = metadata.expires_at {
        map.insert("expires_at".to_string(), expires_at.to_rfc3339());
    }
    map.insert("created_at".to_string(), now.to_rfc3339());
    map
}

/// Metadata filters forwarded with a search request.
fn search_filters(params: &MemorySearchParams) -> BTreeMap<String, String> {
    let mut filters = BTreeMap::new();
    if let Some(category) = params.category {
        filters.insert("category".to_string(), category.as_str().to_string());
    }
    if let Some(tab_id) = params.tab_id {
        filters.insert("tab_id".to_string(), tab_id.to_string());
    }
    if let Some(task_id) = &params.task_id {
        filters.insert("task_id".to_string(), task_id.clone());
    }
    if !params.tags.is_empty() {
        filters.insert("tags".to_string(), params.tags.join(","));
    }
    filters
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
