//! Outbound event payloads and their dedup identity.

use serde::Serialize;

use crate::core::identity::event_id_for;

/// Event name attached to every threshold conversion
pub const EVENT_NAME: &str = "ChatMessagesThresholdCrossed";

/// The `(experiment, session)` pair identifying one logical event across
/// runs and processes.
///
/// Keys order deterministically so a run can collapse duplicates in a
/// `BTreeMap` and deliver batches in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupKey {
    pub experiment: String,
    pub session_id: String,
}

impl DedupKey {
    /// Build a key from a session id and an optional experiment label.
    ///
    /// Labels are trimmed; missing or blank labels fall back to `"default"`.
    pub fn new(session_id: &str, experiment_label: Option<&str>) -> Self {
        let experiment = experiment_label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or("default")
            .to_string();

        Self {
            experiment,
            session_id: session_id.to_string(),
        }
    }

    /// Deterministic identifier passed downstream for duplicate suppression
    pub fn event_id(&self) -> String {
        event_id_for(&self.session_id, Some(&self.experiment))
    }
}

/// The payload unit sent downstream.
///
/// Constructed fresh per dispatch and never persisted. `user_data.ph` holds
/// the hashed identity token; the raw identity never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,

    /// Epoch seconds
    pub event_time: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,

    pub action_source: String,

    /// Deterministic idempotency key for the receiving API
    pub event_id: String,

    pub user_data: UserData,
    pub custom_data: CustomData,
}

/// Hashed identity tokens
#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub ph: Vec<String>,
}

/// Contextual metadata forwarded alongside the event
#[derive(Debug, Clone, Serialize)]
pub struct CustomData {
    pub messages_sent: i64,
    pub experiment_label: String,
    /// Serialized as an explicit null when unknown
    pub source_url: Option<String>,
}

impl ConversionEvent {
    /// Assemble the outbound payload for one eligible row
    pub fn build(
        key: &DedupKey,
        hashed_identity: String,
        messages_sent: i64,
        source_url: Option<String>,
        action_source: &str,
        event_time: i64,
    ) -> Self {
        Self {
            event_name: EVENT_NAME.to_string(),
            event_time,
            event_source_url: source_url.clone(),
            action_source: action_source.to_string(),
            event_id: key.event_id(),
            user_data: UserData {
                ph: vec![hashed_identity],
            },
            custom_data: CustomData {
                messages_sent,
                experiment_label: key.experiment.clone(),
                source_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_defaults_blank_labels() {
        assert_eq!(DedupKey::new("s1", None).experiment, "default");
        assert_eq!(DedupKey::new("s1", Some("")).experiment, "default");
        assert_eq!(DedupKey::new("s1", Some("  ")).experiment, "default");
        assert_eq!(DedupKey::new("s1", Some(" A ")).experiment, "A");
    }

    #[test]
    fn test_dedup_key_event_id() {
        let key = DedupKey::new("s1", Some("A"));
        assert_eq!(key.event_id(), "chat-threshold:A:s1");

        let default = DedupKey::new("s1", None);
        assert_eq!(default.event_id(), "chat-threshold:default:s1");
    }

    #[test]
    fn test_event_serialization_omits_missing_source_url() {
        let key = DedupKey::new("s1", Some("A"));
        let event = ConversionEvent::build(&key, "abc123".to_string(), 7, None, "website", 1_700_000_000);

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("event_source_url").is_none());
        // custom_data carries an explicit null instead
        assert!(value["custom_data"]["source_url"].is_null());
        assert_eq!(value["event_id"], "chat-threshold:A:s1");
        assert_eq!(value["user_data"]["ph"][0], "abc123");
    }

    #[test]
    fn test_event_serialization_with_source_url() {
        let key = DedupKey::new("s1", Some("A"));
        let event = ConversionEvent::build(
            &key,
            "abc123".to_string(),
            7,
            Some("https://x".to_string()),
            "website",
            1_700_000_000,
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_source_url"], "https://x");
        assert_eq!(value["custom_data"]["source_url"], "https://x");
        assert_eq!(value["custom_data"]["messages_sent"], 7);
    }
}
