//! In-memory status cache.
//!
//! Holds the whole resolved set behind a single `Arc`. Readers clone the
//! `Arc` and iterate without holding the lock, so a reader always sees one
//! complete generation of records: either the one before a
//! [`StatusCache::replace_all`] or the one after, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use upwatch_core::{EndpointId, StatusRecord};

/// An immutable view of every cached record at one point in time.
pub type StatusSnapshot = Arc<HashMap<EndpointId, StatusRecord>>;

/// Endpoint id → last resolved status.
#[derive(Debug, Default)]
pub struct StatusCache {
    records: RwLock<StatusSnapshot>,
}

impl StatusCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up one endpoint's record.
    pub fn get(&self, endpoint_id: &str) -> Option<StatusRecord> {
        let records = self.records.read().expect("status cache lock");
        records.get(endpoint_id).cloned()
    }

    /// Snapshot of every record.
    pub fn get_all(&self) -> StatusSnapshot {
        let records = self.records.read().expect("status cache lock");
        Arc::clone(&records)
    }

    /// Swap in a complete new record set and return it as a snapshot.
    pub fn replace_all(&self, records: HashMap<EndpointId, StatusRecord>) -> StatusSnapshot {
        let snapshot = Arc::new(records);
        let mut current = self.records.write().expect("status cache lock");
        *current = Arc::clone(&snapshot);
        debug!(endpoints = snapshot.len(), "status cache replaced");
        snapshot
    }

    /// Update a single endpoint's record.
    ///
    /// Snapshots handed out earlier keep the previous record.
    pub fn set(&self, endpoint_id: &str, record: StatusRecord) {
        let mut current = self.records.write().expect("status cache lock");
        Arc::make_mut(&mut current).insert(endpoint_id.to_string(), record);
        debug!(%endpoint_id, "status cache entry updated");
    }

    /// Number of cached endpoints.
    pub fn len(&self) -> usize {
        self.records.read().expect("status cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
