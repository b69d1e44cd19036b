//! In-memory ledger for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::DedupKey;

use super::{ledger_key, Ledger, LedgerError, DISPATCH_TTL_SECS};

/// Ledger held entirely in process memory.
///
/// Honors the same retention window as the durable store so expiry behavior
/// can be exercised without a live Redis.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an entry with an arbitrary timestamp, for expiry tests
    pub fn insert_at(&self, key: &DedupKey, when: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(ledger_key(key), when);
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn exists(&self, key: &DedupKey) -> Result<bool, LedgerError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| LedgerError::Operation(e.to_string()))?;

        match entries.get(&ledger_key(key)) {
            Some(when) => {
                let age = Utc::now().signed_duration_since(*when);
                Ok(age < Duration::seconds(DISPATCH_TTL_SECS as i64))
            }
            None => Ok(false),
        }
    }

    async fn mark_dispatched(
        &self,
        key: &DedupKey,
        when: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| LedgerError::Operation(e.to_string()))?;

        entries.insert(ledger_key(key), when);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}
