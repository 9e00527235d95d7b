//! Shared query cache
//!
//! One `QueryClient` is shared by every resource created with
//! [`create_query`](super::create_query). Entries are stored as JSON so that
//! resources with different output types can live in the same map.
//! `Value::Null` is the "fetched, but empty" sentinel; a missing entry means
//! the key was never fetched.

use super::key::{QueryFilter, QueryKey};
use crate::error::QueryKitError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the change-notification channel
const EVENT_CAPACITY: usize = 256;

/// Fetch status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Not fetched, or fetching is disabled
    Idle,
    Loading,
    Success,
    Error,
}

/// One cached result plus its metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Last successfully stored value
    pub data: Option<Value>,

    pub status: QueryStatus,

    /// Error of the most recent failed fetch
    pub error: Option<Arc<QueryKitError>>,

    /// When `data` was last written
    pub updated_at: Option<DateTime<Utc>>,

    /// Set by invalidation; cleared by the next write
    pub stale: bool,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            updated_at: None,
            stale: false,
        }
    }

    /// Whether the entry can be served without refetching
    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        if self.stale || self.data.is_none() {
            return false;
        }

        let Some(updated_at) = self.updated_at else {
            return false;
        };

        // A window past chrono's range never expires
        match chrono::Duration::from_std(stale_time) {
            Ok(stale_time) => updated_at
                .checked_add_signed(stale_time)
                .map_or(true, |until| Utc::now() < until),
            Err(_) => true,
        }
    }
}

/// Change notification for cache subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Removed(QueryKey),
}

/// Process-wide keyed cache
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryClient {
    /// Create an empty cache
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                entries: RwLock::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Receive a notification for every write, invalidation and removal
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of an entry
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.entries.read().get(key).cloned()
    }

    /// Stored value for `key`, `None` if it was never written
    pub fn get_query_data(&self, key: &QueryKey) -> Option<Value> {
        self.inner
            .entries
            .read()
            .get(key)
            .and_then(|entry| entry.data.clone())
    }

    /// Overwrite the value for `key`
    pub fn set_query_data(&self, key: QueryKey, value: Value) {
        {
            let mut entries = self.inner.entries.write();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
            entry.data = Some(value);
            entry.status = QueryStatus::Success;
            entry.error = None;
            entry.updated_at = Some(Utc::now());
            entry.stale = false;
        }

        debug!("Cache write {}", key);
        self.emit(CacheEvent::Updated(key));
    }

    /// Mark every entry selected by `filter` stale; returns how many matched
    pub fn invalidate_queries(&self, filter: &QueryFilter) -> usize {
        let invalidated: Vec<QueryKey> = {
            let mut entries = self.inner.entries.write();
            entries
                .iter_mut()
                .filter(|(key, _)| filter.matches(key))
                .map(|(key, entry)| {
                    entry.stale = true;
                    key.clone()
                })
                .collect()
        };

        debug!("Invalidated {} cache entries", invalidated.len());
        let count = invalidated.len();
        for key in invalidated {
            self.emit(CacheEvent::Invalidated(key));
        }
        count
    }

    /// Drop every entry selected by `filter`; returns how many were removed
    pub fn remove_queries(&self, filter: &QueryFilter) -> usize {
        let removed: Vec<QueryKey> = {
            let mut entries = self.inner.entries.write();
            let keys: Vec<QueryKey> = entries
                .keys()
                .filter(|key| filter.matches(key))
                .cloned()
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };

        let count = removed.len();
        for key in removed {
            self.emit(CacheEvent::Removed(key));
        }
        count
    }

    /// Drop everything
    pub fn clear(&self) {
        let keys: Vec<QueryKey> = self.inner.entries.write().drain().map(|(k, _)| k).collect();
        for key in keys {
            self.emit(CacheEvent::Removed(key));
        }
    }

    /// All cached keys, in no particular order
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flag `key` as loading until the returned guard is completed or dropped
    pub(crate) fn mark_loading(&self, key: &QueryKey) -> LoadingGuard {
        let previous = {
            let mut entries = self.inner.entries.write();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
            std::mem::replace(&mut entry.status, QueryStatus::Loading)
        };
        self.emit(CacheEvent::Updated(key.clone()));

        LoadingGuard {
            client: self.clone(),
            key: key.clone(),
            previous: Some(previous),
        }
    }

    /// Record a failed fetch, keeping whatever data was cached before
    pub(crate) fn record_error(&self, key: &QueryKey, error: Arc<QueryKitError>) {
        {
            let mut entries = self.inner.entries.write();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
            entry.status = QueryStatus::Error;
            entry.error = Some(error);
        }
        self.emit(CacheEvent::Updated(key.clone()));
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

/// Restores the pre-fetch status if a fetch is abandoned before it finishes
pub(crate) struct LoadingGuard {
    client: QueryClient,
    key: QueryKey,
    previous: Option<QueryStatus>,
}

impl LoadingGuard {
    /// The fetch finished and wrote its own status
    pub(crate) fn complete(mut self) {
        self.previous = None;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };

        let restored = {
            let mut entries = self.client.inner.entries.write();
            match entries.get_mut(&self.key) {
                Some(entry) if entry.status == QueryStatus::Loading => {
                    entry.status = previous;
                    true
                }
                _ => false,
            }
        };

        if restored {
            debug!("Fetch for {} abandoned", self.key);
            self.client.emit(CacheEvent::Updated(self.key.clone()));
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}
