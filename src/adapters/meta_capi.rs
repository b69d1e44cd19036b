//! Meta Conversions API delivery client.
//!
//! Delivers each batch as a single bulk-ingest POST. The event identifiers
//! inside the batch are deterministic, so the endpoint can collapse
//! duplicates even if a batch is retried past a success this process never
//! observed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::config::MetaConfig;
use crate::core::retry::{with_retries, RetryPolicy};
use crate::domain::ConversionEvent;

use super::EventSink;

/// Graph API version pinned for the events endpoint
const GRAPH_API_VERSION: &str = "v18.0";

/// Client for one pixel's bulk events endpoint
pub struct CapiClient {
    config: MetaConfig,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl CapiClient {
    /// Create a client with the default retry schedule
    pub fn new(config: MetaConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the retry schedule
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn events_url(&self) -> String {
        format!(
            "https://graph.facebook.com/{}/{}/events",
            GRAPH_API_VERSION, self.config.pixel_id
        )
    }

    async fn send_once(&self, batch: &[ConversionEvent]) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = vec![("access_token", self.config.access_token.as_str())];
        if let Some(ref code) = self.config.test_event_code {
            query.push(("test_event_code", code));
        }

        let response = self
            .client
            .post(self.events_url())
            .query(&query)
            .json(&json!({ "data": batch }))
            .send()
            .await
            .context("Failed to reach the attribution endpoint")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read attribution response")?;

        if !status.is_success() {
            anyhow::bail!("Meta CAPI {}: {}", status.as_u16(), text.trim());
        }

        serde_json::from_str(&text).context("Attribution response is not valid JSON")
    }
}

#[async_trait]
impl EventSink for CapiClient {
    fn name(&self) -> &str {
        "meta-capi"
    }

    async fn send(&self, batch: &[ConversionEvent]) -> Result<Value> {
        info!(events = batch.len(), "delivering event batch");
        with_retries(self.retry, "meta-capi", || self.send_once(batch)).await
    }
}
