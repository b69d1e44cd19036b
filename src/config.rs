//! Environment-resolved configuration.
//!
//! All settings come from the environment (the deployment surface is a
//! scheduled container); required values reject startup. Credentials that
//! have more than one source are resolved once, in order, into a single
//! effective value. The resolved configuration is cached process-wide.

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::{Context, Result};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<Config, String>> = OnceLock::new();

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub metabase: MetabaseConfig,
    pub meta: MetaConfig,

    /// Dedup ledger store
    pub redis_url: String,

    /// Internal/test identities excluded from dispatch (E.164)
    pub test_numbers: HashSet<String>,
}

/// Analytics source settings
#[derive(Debug, Clone)]
pub struct MetabaseConfig {
    pub site_url: String,

    /// Effective session token, resolved from the ordered credential sources
    pub token: String,

    /// Saved question to run
    pub question_id: String,

    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub bot_id: Option<String>,

    pub date_start_tag: String,
    pub date_end_tag: String,
    pub bot_id_tag: String,
}

/// Attribution endpoint settings
#[derive(Debug, Clone)]
pub struct MetaConfig {
    pub pixel_id: String,
    pub access_token: String,

    /// Test-mode marker forwarded to the endpoint when set
    pub test_event_code: Option<String>,

    pub action_source: String,
}

impl Config {
    /// Resolve configuration from the environment
    pub fn from_env() -> Result<Self> {
        let metabase = MetabaseConfig {
            site_url: required("METABASE_SITE_URL")?,
            token: first_credential(&["METABASE_SESSION_TOKEN", "METABASE_API_TOKEN"])?,
            question_id: required("METABASE_QUESTION_ID")?,
            date_start: optional("METABASE_DATE_START"),
            date_end: optional("METABASE_DATE_END"),
            bot_id: optional("METABASE_BOT_ID"),
            date_start_tag: optional("METABASE_DATE_START_TAG")
                .unwrap_or_else(|| "date_start".to_string()),
            date_end_tag: optional("METABASE_DATE_END_TAG")
                .unwrap_or_else(|| "date_end".to_string()),
            bot_id_tag: optional("METABASE_BOT_ID_TAG").unwrap_or_else(|| "bot_id".to_string()),
        };

        let meta = MetaConfig {
            pixel_id: required("META_PIXEL_ID")?,
            access_token: required("META_ACCESS_TOKEN")?,
            test_event_code: optional("META_TEST_EVENT_CODE"),
            action_source: optional("META_ACTION_SOURCE").unwrap_or_else(|| "website".to_string()),
        };

        Ok(Self {
            metabase,
            meta,
            redis_url: required("REDIS_URL")?,
            test_numbers: parse_test_numbers(optional("TEST_NUMBERS_E164").as_deref()),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing required env var {}", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Resolve the first present value from an ordered list of credential sources
fn first_credential(names: &[&str]) -> Result<String> {
    names
        .iter()
        .find_map(|name| optional(name))
        .with_context(|| format!("Missing credential; tried {}", names.join(", ")))
}

/// Parse the comma-separated exclusion list
fn parse_test_numbers(csv: Option<&str>) -> HashSet<String> {
    csv.map(|csv| {
        csv.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static Config> {
    let result = CONFIG.get_or_init(|| Config::from_env().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_numbers() {
        let set = parse_test_numbers(Some("+15550001111, +15550002222 ,,  "));
        assert_eq!(set.len(), 2);
        assert!(set.contains("+15550001111"));
        assert!(set.contains("+15550002222"));
    }

    #[test]
    fn test_parse_test_numbers_empty() {
        assert!(parse_test_numbers(None).is_empty());
        assert!(parse_test_numbers(Some("")).is_empty());
    }
}
