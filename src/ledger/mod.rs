//! Durable dedup ledger recording which logical events have been dispatched.
//!
//! Ledger writes are the pipeline's only persisted side effect besides the
//! outbound call. Entries are written after confirmed delivery success and
//! expire on their own; the pipeline never deletes them.
//!
//! Concurrent runs are not serialized by the store: two overlapping runs can
//! both pass the existence check before either commits. At-most-one
//! concurrent run is a deployment contract, and the deterministic event
//! identifier gives the downstream API a second chance to collapse the
//! duplicate if that contract is ever violated.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::domain::DedupKey;

// Re-export the ledger implementations
pub use self::redis::RedisLedger;
pub use memory::MemoryLedger;

/// Key namespace shared by every ledger entry
pub const KEY_NAMESPACE: &str = "capi:chat-threshold";

/// How long a dispatched marker is retained (180 days)
pub const DISPATCH_TTL_SECS: u64 = 60 * 60 * 24 * 180;

/// Storage key for one logical event
pub fn ledger_key(key: &DedupKey) -> String {
    format!("{}:{}:{}", KEY_NAMESPACE, key.experiment, key.session_id)
}

/// Errors from the durable store.
///
/// A failed existence check is never "not yet dispatched"; callers abort
/// the run rather than risk a duplicate send.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store could not be reached
    #[error("ledger store unreachable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed
    #[error("ledger operation failed: {0}")]
    Operation(String),
}

/// Durable record of dispatched events, shared across runs and restarts.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether `key` was marked dispatched within the retention window
    async fn exists(&self, key: &DedupKey) -> Result<bool, LedgerError>;

    /// Record a confirmed dispatch at `when`; the entry expires after
    /// [`DISPATCH_TTL_SECS`]
    async fn mark_dispatched(&self, key: &DedupKey, when: DateTime<Utc>)
        -> Result<(), LedgerError>;

    /// Verify the store is reachable
    async fn health_check(&self) -> Result<(), LedgerError>;
}

/// Process-wide ledger handle, connected on first use
static SHARED: OnceCell<RedisLedger> = OnceCell::const_new();

/// Acquire the shared Redis-backed ledger.
///
/// Connects on first use and health-checks before every reuse, so callers
/// never hold a stale handle. Reconnection after a dropped connection is the
/// connection manager's job.
pub async fn acquire(url: &str) -> Result<&'static RedisLedger, LedgerError> {
    let ledger = SHARED
        .get_or_try_init(|| RedisLedger::connect(url))
        .await?;
    ledger.health_check().await?;
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_key_shape() {
        let key = DedupKey::new("s1", Some("A"));
        assert_eq!(ledger_key(&key), "capi:chat-threshold:A:s1");

        let default = DedupKey::new("s1", None);
        assert_eq!(ledger_key(&default), "capi:chat-threshold:default:s1");
    }

    #[test]
    fn test_retention_window() {
        assert_eq!(DISPATCH_TTL_SECS, 15_552_000);
    }
}
