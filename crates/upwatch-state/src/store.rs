//! StateStore — redb-backed persistence for manual-test results.
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. The store
//! supports both on-disk and in-memory backends (the latter for testing).
//!
//! Reads are lenient: a value that no longer decodes as a
//! [`ManualTestRecord`] is logged and reported as absent rather than as an
//! error, so a corrupted entry only costs that endpoint its manual-test
//! evidence.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{debug, warn};
use upwatch_core::ManualTestRecord;

use crate::error::{StateError, StateResult};
use crate::tables::MANUAL_TESTS;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(MANUAL_TESTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Persist a manual-test outcome for an endpoint, replacing any previous one.
    pub fn record_manual_test(
        &self,
        endpoint_id: &str,
        success: bool,
        tested_at_ms: u64,
    ) -> StateResult<()> {
        self.put_manual_test(endpoint_id, &ManualTestRecord::new(success, tested_at_ms))
    }

    /// Insert or update a manual-test record.
    pub fn put_manual_test(&self, endpoint_id: &str, record: &ManualTestRecord) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        self.put_raw(endpoint_id, &value)?;
        debug!(%endpoint_id, tested_at_ms = record.tested_at_ms, "manual test stored");
        Ok(())
    }

    fn put_raw(&self, endpoint_id: &str, value: &[u8]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(MANUAL_TESTS).map_err(map_err!(Table))?;
            table.insert(endpoint_id, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get the manual-test record for an endpoint.
    ///
    /// Undecodable values read as `None`.
    pub fn get_manual_test(&self, endpoint_id: &str) -> StateResult<Option<ManualTestRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MANUAL_TESTS).map_err(map_err!(Table))?;
        match table.get(endpoint_id).map_err(map_err!(Read))? {
            Some(guard) => Ok(decode(endpoint_id, guard.value())),
            None => Ok(None),
        }
    }
}

fn decode(endpoint_id: &str, bytes: &[u8]) -> Option<ManualTestRecord> {
    match serde_json::from_slice(bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(%endpoint_id, error = %e, "ignoring malformed manual test record");
            None
        }
    }
}
