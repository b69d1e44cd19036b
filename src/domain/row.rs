//! Candidate rows from the analytics source.

use serde::{Deserialize, Serialize};

/// One candidate conversion event as returned by the analytics query.
///
/// Rows are supplied fresh each run and are never persisted by the pipeline;
/// the query result is the source of truth for what *might* be dispatched,
/// the ledger for what already was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRow {
    /// Opaque stable identifier for one conversation/session
    pub session_id: String,

    /// Raw contact identifier, unnormalized (may be missing or malformed)
    #[serde(default)]
    pub phone_e164: Option<String>,

    /// Messages exchanged in the session so far
    pub messages_sent: i64,

    /// Page the conversation started from, if known
    #[serde(default)]
    pub source_url: Option<String>,

    /// A/B experiment label; missing or blank means "default"
    #[serde(default)]
    pub experiment_label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_parses_with_nulls() {
        let json = r#"{
            "session_id": "s1",
            "phone_e164": null,
            "messages_sent": 3,
            "source_url": null
        }"#;

        let row: SourceRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.session_id, "s1");
        assert!(row.phone_e164.is_none());
        assert_eq!(row.messages_sent, 3);
        assert!(row.experiment_label.is_none());
    }

    #[test]
    fn test_row_parses_full_shape() {
        let json = r#"{
            "session_id": "s2",
            "phone_e164": "+15550001111",
            "messages_sent": 12,
            "source_url": "https://example.com/landing",
            "experiment_label": "B"
        }"#;

        let row: SourceRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.phone_e164.as_deref(), Some("+15550001111"));
        assert_eq!(row.experiment_label.as_deref(), Some("B"));
    }
}
