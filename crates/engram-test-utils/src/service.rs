//! In-memory stub of the remote memory service.

use async_trait::async_trait;
use engram_store::{MemoryService, ServiceRecord, StoreError};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Per-operation call counters observed by the stub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubCallCounts {
    pub probes: usize,
    pub adds: usize,
    pub searches: usize,
    pub updates: usize,
    pub deletes: usize,
    pub lists: usize,
}

impl StubCallCounts {
    /// Total calls across every operation.
    pub fn total(&self) -> usize {
        self.probes + self.adds + self.searches + self.updates + self.deletes + self.lists
    }
}

#[derive(Default)]
struct StubState {
    records: Vec<ServiceRecord>,
    next_id: usize,
    calls: StubCallCounts,
    fail: bool,
}

/// In-memory memory service for tests.
///
/// Counts every call, assigns sequential ids, matches queries by substring,
/// and can be switched into a failing mode to exercise degradation paths.
#[derive(Default)]
pub struct StubMemoryService {
    state: Mutex<StubState>,
}

impl StubMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a connectivity error.
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    /// Calls observed so far (failed attempts included).
    pub fn calls(&self) -> StubCallCounts {
        self.state.lock().calls
    }

    /// Count of records currently stored.
    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }
}

fn injected() -> StoreError {
    StoreError::Connectivity("injected failure".to_string())
}

/// Every filter key must match; the tags filter matches on any overlap.
fn matches_filters(record: &ServiceRecord, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(key, wanted)| {
        let Some(stored) = record.metadata.get(key) else {
            return false;
        };
        if key == "tags" {
            let stored: Vec<&str> = stored.split(',').map(str::trim).collect();
            wanted
                .split(',')
                .map(str::trim)
                .any(|tag| stored.contains(&tag))
        } else {
            stored == wanted
        }
    })
}

#[async_trait]
impl MemoryService for StubMemoryService {
    async fn probe(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.probes += 1;
        if state.fail {
            return Err(injected());
        }
        Ok(())
    }

    async fn add(&self, record: ServiceRecord) -> Result<String, StoreError> {
        let mut state = self.state.lock();
        state.calls.adds += 1;
        if state.fail {
            return Err(injected());
        }
        let id = format!("mem-{}", state.next_id);
        state.next_id += 1;
        state.records.push(ServiceRecord {
            id: Some(id.clone()),
            ..record
        });
        Ok(id)
    }

    async fn search(
        &self,
        scope_id: &str,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        let mut state = self.state.lock();
        state.calls.searches += 1;
        if state.fail {
            return Err(injected());
        }
        Ok(state
            .records
            .iter()
            .filter(|record| record.scope_id == scope_id)
            .filter(|record| query.is_empty() || record.body.contains(query))
            .filter(|record| matches_filters(record, filters))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, content: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.updates += 1;
        if state.fail {
            return Err(injected());
        }
        let record = state
            .records
            .iter_mut()
            .find(|record| record.id.as_deref() == Some(id));
        match record {
            Some(record) => {
                record.body = content.to_string();
                Ok(())
            }
            None => Err(StoreError::Rejected {
                status: 404,
                message: format!("no such record: {id}"),
            }),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.deletes += 1;
        if state.fail {
            return Err(injected());
        }
        let before = state.records.len();
        state
            .records
            .retain(|record| record.id.as_deref() != Some(id));
        if state.records.len() == before {
            return Err(StoreError::Rejected {
                status: 404,
                message: format!("no such record: {id}"),
            });
        }
        Ok(())
    }

    async fn list(&self, scope_id: &str, limit: usize) -> Result<Vec<ServiceRecord>, StoreError> {
        let mut state = self.state.lock();
        state.calls.lists += 1;
        if state.fail {
            return Err(injected());
        }
        Ok(state
            .records
            .iter()
            .filter(|record| record.scope_id == scope_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
