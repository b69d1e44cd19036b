//! Adapter interfaces for the pipeline's external collaborators.
//!
//! The analytics source and the attribution endpoint are opaque upstreams;
//! these traits keep the orchestrator agnostic to their transports.

pub mod meta_capi;
pub mod metabase;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ConversionEvent, SourceRow};

// Re-export the concrete clients
pub use meta_capi::CapiClient;
pub use metabase::MetabaseClient;

/// Upstream query yielding candidate rows
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Fetch the current batch of candidate rows
    async fn fetch_rows(&self) -> Result<Vec<SourceRow>>;
}

/// Downstream bulk-ingest endpoint for outbound events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Human-readable sink name
    fn name(&self) -> &str;

    /// Deliver the whole batch in one call, returning the raw response body
    /// for observability
    async fn send(&self, batch: &[ConversionEvent]) -> Result<Value>;
}
