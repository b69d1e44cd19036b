//! Metabase card-query client (the BI-query adapter).
//!
//! Runs a saved question and deserializes its JSON rows. The query itself is
//! owned by the analytics side; this client only supplies template-tag
//! parameters and retries the call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::MetabaseConfig;
use crate::core::retry::{with_retries, RetryPolicy};
use crate::domain::SourceRow;

use super::RowSource;

/// Client for a saved Metabase question returning candidate rows
pub struct MetabaseClient {
    config: MetabaseConfig,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl MetabaseClient {
    /// Create a client with the default retry schedule
    pub fn new(config: MetabaseConfig) -> Self {
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

    fn query_url(&self) -> String {
        format!(
            "{}/api/card/{}/query/json",
            self.config.site_url, self.config.question_id
        )
    }

    /// Template-tag parameters for the saved question; unset values are
    /// omitted entirely so the question's defaults apply
    fn parameters(&self) -> Vec<Value> {
        let mut parameters = Vec::new();

        if let Some(ref value) = self.config.date_start {
            parameters.push(template_tag(&self.config.date_start_tag, value));
        }
        if let Some(ref value) = self.config.date_end {
            parameters.push(template_tag(&self.config.date_end_tag, value));
        }
        if let Some(ref value) = self.config.bot_id {
            parameters.push(template_tag(&self.config.bot_id_tag, value));
        }

        parameters
    }

    async fn fetch_once(&self) -> Result<Vec<SourceRow>> {
        let parameters = self.parameters();
        let body = if parameters.is_empty() {
            json!({})
        } else {
            json!({ "parameters": parameters })
        };

        let response = self
            .client
            .post(self.query_url())
            .header("X-Metabase-Session", &self.config.token)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Metabase")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Metabase {}: {}", status.as_u16(), text.trim());
        }

        response
            .json::<Vec<SourceRow>>()
            .await
            .context("Failed to parse Metabase rows")
    }
}

fn template_tag(tag: &str, value: &str) -> Value {
    json!({
        "type": "category",
        "target": ["variable", ["template-tag", tag]],
        "value": value,
    })
}

#[async_trait]
impl RowSource for MetabaseClient {
    fn name(&self) -> &str {
        "metabase"
    }

    async fn fetch_rows(&self) -> Result<Vec<SourceRow>> {
        let rows = with_retries(self.retry, "metabase", || self.fetch_once()).await?;
        debug!(rows = rows.len(), "fetched candidate rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MetabaseConfig {
        MetabaseConfig {
            site_url: "https://bi.example.com".to_string(),
            token: "TOKEN".to_string(),
            question_id: "42".to_string(),
            date_start: None,
            date_end: None,
            bot_id: None,
            date_start_tag: "date_start".to_string(),
            date_end_tag: "date_end".to_string(),
            bot_id_tag: "bot_id".to_string(),
        }
    }

    #[test]
    fn test_query_url() {
        let client = MetabaseClient::new(config());
        assert_eq!(
            client.query_url(),
            "https://bi.example.com/api/card/42/query/json"
        );
    }

    #[test]
    fn test_parameters_omitted_when_unset() {
        let client = MetabaseClient::new(config());
        assert!(client.parameters().is_empty());
    }

    #[test]
    fn test_parameters_built_per_template_tag() {
        let mut cfg = config();
        cfg.date_start = Some("2024-01-01".to_string());
        cfg.bot_id = Some("bot-7".to_string());
        cfg.bot_id_tag = "assistant_id".to_string();

        let client = MetabaseClient::new(cfg);
        let parameters = client.parameters();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0]["value"], "2024-01-01");
        assert_eq!(parameters[0]["target"][1][1], "date_start");
        assert_eq!(parameters[1]["target"][1][1], "assistant_id");
    }
}
