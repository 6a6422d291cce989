//! Remote memory service contract.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Flat record shape exchanged with a remote keyed store.
///
/// All non-string metadata is stringified before transmission and parsed
/// back on read by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    /// Store-assigned identifier; `None` before the first write.
    pub id: Option<String>,
    /// Owning scope id.
    pub scope_id: String,
    /// Free-text body.
    pub body: String,
    /// Flat string-keyed metadata map.
    pub metadata: BTreeMap<String, String>,
    /// Server-side update time, when the store reports one.
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
/// Abstract keyed-store API backing the memory layer.
pub trait MemoryService: Send + Sync {
    /// Issue a harmless query to verify connectivity and auth.
    async fn probe(&self) -> Result<(), StoreError>;

    /// Persist a record and return the store-assigned id.
    async fn add(&self, record: ServiceRecord) -> Result<String, StoreError>;

    /// Search records in a scope, optionally constrained by metadata filters.
    async fn search(
        &self,
        scope_id: &str,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ServiceRecord>, StoreError>;

    /// Replace a record's body.
    async fn update(&self, id: &str, content: &str) -> Result<(), StoreError>;

    /// Delete a record by id.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// List records in a scope without query filtering.
    async fn list(&self, scope_id: &str, limit: usize) -> Result<Vec<ServiceRecord>, StoreError>;
}
