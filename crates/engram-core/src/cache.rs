//! Bounded local mirror of already-seen entries.

use chrono::{DateTime, Duration, Utc};
use engram_protocol::MemoryEntry;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

struct CachedEntry {
    entry: MemoryEntry,
    stored_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedEntry>,
    /// Usage order, least recently used at the front.
    order: VecDeque<String>,
}

/// Write-through mirror keyed by entry id.
///
/// Bounded: the least recently used entry is evicted past `capacity`, and
/// entries older than the retention window are dropped on access. The cache
/// is never consulted to decide whether a remote call is necessary; it is a
/// secondary index for O(1) lookup of already-fetched entries and may be
/// empty without affecting any external-facing guarantee.
pub struct LocalCache {
    state: Mutex<CacheState>,
    capacity: usize,
    retention: Option<Duration>,
}

impl LocalCache {
    /// Cache holding at most `capacity` entries for at most
    /// `retention_days` days; 0 days disables the window.
    pub fn new(capacity: usize, retention_days: u32) -> Self {
        let retention = if retention_days == 0 {
            None
        } else {
            Some(Duration::days(i64::from(retention_days)))
        };
        Self::with_retention(capacity, retention)
    }

    /// Cache with an explicit retention window.
    pub fn with_retention(capacity: usize, retention: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
            retention,
        }
    }

    /// Upsert an entry by id, marking it most recently used.
    pub fn insert(&self, entry: MemoryEntry) {
        let mut state = self.state.lock();
        let id = entry.id.clone();
        state.entries.insert(
            id.clone(),
            CachedEntry {
                entry,
                stored_at: Utc::now(),
            },
        );
        state.order.retain(|key| *key != id);
        state.order.push_back(id);
        while state.entries.len() > self.capacity {
            match state.order.pop_front() {
                Some(evicted) => {
                    state.entries.remove(&evicted);
                }
                None => break,
            }
        }
    }

    /// Look up an entry, promoting it to most recently used.
    ///
    /// Entries past the retention window are dropped and reported absent.
    pub fn get(&self, id: &str) -> Option<MemoryEntry> {
        let mut state = self.state.lock();
        let expired = match state.entries.get(id) {
            Some(cached) => self
                .retention
                .is_some_and(|window| Utc::now() - cached.stored_at >= window),
            None => return None,
        };
        if expired {
            state.entries.remove(id);
            state.order.retain(|key| key != id);
            return None;
        }
        state.order.retain(|key| key != id);
        state.order.push_back(id.to_string());
        state.entries.get(id).map(|cached| cached.entry.clone())
    }

    /// Remove an entry by id.
    pub fn remove(&self, id: &str) -> Option<MemoryEntry> {
        let mut state = self.state.lock();
        state.order.retain(|key| key != id);
        state.entries.remove(id).map(|cached| cached.entry)
    }

    /// Count of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}
