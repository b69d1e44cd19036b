//! Redis-backed ledger.
//!
//! Uses a managed async connection; reconnection after a drop belongs to
//! the connection manager, not the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::domain::DedupKey;

use super::{ledger_key, Ledger, LedgerError, DISPATCH_TTL_SECS};

impl From<redis::RedisError> for LedgerError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_timeout() || e.is_connection_refusal() {
            LedgerError::Unavailable(e.to_string())
        } else {
            LedgerError::Operation(e.to_string())
        }
    }
}

/// Ledger over a Redis keyspace
pub struct RedisLedger {
    conn: ConnectionManager,
}

impl RedisLedger {
    /// Connect to the store at `url` (e.g. `redis://127.0.0.1/`)
    pub async fn connect(url: &str) -> Result<Self, LedgerError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Ledger for RedisLedger {
    async fn exists(&self, key: &DedupKey) -> Result<bool, LedgerError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(ledger_key(key)).await?;
        Ok(found)
    }

    async fn mark_dispatched(
        &self,
        key: &DedupKey,
        when: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        let storage_key = ledger_key(key);
        let _: () = conn
            .set_ex(&storage_key, when.to_rfc3339(), DISPATCH_TTL_SECS)
            .await?;
        debug!(key = %storage_key, "marked dispatched");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
