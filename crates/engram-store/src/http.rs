//! HTTP-backed implementation of the remote memory service.

use crate::error::StoreError;
use crate::service::{MemoryService, ServiceRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.engram.dev";
/// Reserved scope used for connectivity probes.
const PROBE_SCOPE: &str = "engram_probe";
const USER_AGENT: &str = concat!("engram/", env!("CARGO_PKG_VERSION"));

/// Remote memory service speaking the keyed-store REST API.
pub struct HttpMemoryService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMemoryService {
    /// Service against the default endpoint.
    pub fn new(api_key: &str) -> Result<Self, StoreError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Service against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: &str) -> Result<Self, StoreError> {
        let mut auth = HeaderValue::from_str(&format!("Token {api_key}")).map_err(|_| {
            StoreError::Connectivity("api key contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Serialize)]
struct AddRequest<'a> {
    scope_id: &'a str,
    body: &'a str,
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    scope_id: &'a str,
    query: &'a str,
    limit: usize,
    filters: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Deserialize)]
struct WireRecord {
    id: String,
    #[serde(default)]
    scope_id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<WireRecord> for ServiceRecord {
    fn from(record: WireRecord) -> Self {
        ServiceRecord {
            id: Some(record.id),
            scope_id: record.scope_id,
            body: record.body,
            metadata: record.metadata,
            updated_at: record.updated_at,
        }
    }
}

/// Map a non-success response into a structured rejection.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl MemoryService for HttpMemoryService {
    async fn probe(&self) -> Result<(), StoreError> {
        self.search(PROBE_SCOPE, "status", 1, &BTreeMap::new())
            .await
            .map(|_| ())
    }

    async fn add(&self, record: ServiceRecord) -> Result<String, StoreError> {
        let request = AddRequest {
            scope_id: &record.scope_id,
            body: &record.body,
            metadata: &record.metadata,
        };
        let response = self
            .client
            .post(self.endpoint("/v1/memories"))
            .json(&request)
            .send()
            .await?;
        let payload: AddResponse = ensure_success(response).await?.json().await?;
        debug!("remote add accepted (id={})", payload.id);
        Ok(payload.id)
    }

    async fn search(
        &self,
        scope_id: &str,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        let request = SearchRequest {
            scope_id,
            query,
            limit,
            filters,
        };
        let response = self
            .client
            .post(self.endpoint("/v1/memories/search"))
            .json(&request)
            .send()
            .await?;
        let payload: RecordsResponse = ensure_success(response).await?.json().await?;
        debug!(
            "remote search returned (scope={scope_id}, records={})",
            payload.records.len()
        );
        Ok(payload.records.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: &str, content: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.endpoint(&format!("/v1/memories/{id}")))
            .json(&UpdateRequest { body: content })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("/v1/memories/{id}")))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list(&self, scope_id: &str, limit: usize) -> Result<Vec<ServiceRecord>, StoreError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.endpoint("/v1/memories"))
            .query(&[("scope_id", scope_id), ("limit", limit.as_str())])
            .send()
            .await?;
        let payload: RecordsResponse = ensure_success(response).await?.json().await?;
        Ok(payload.records.into_iter().map(Into::into).collect())
    }
}
