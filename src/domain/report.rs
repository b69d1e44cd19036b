//! Run reports returned to the trigger caller.

use serde::Serialize;
use serde_json::Value;

/// Outcome of one successful dispatch run.
///
/// `meta` carries the downstream response body verbatim for observability;
/// the pipeline never interprets it.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub status: String,
    pub processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl DispatchReport {
    /// A run that found nothing to dispatch
    pub fn empty() -> Self {
        Self {
            status: "ok".to_string(),
            processed: 0,
            meta: None,
        }
    }

    /// A run that delivered `processed` events
    pub fn delivered(processed: usize, meta: Value) -> Self {
        Self {
            status: "ok".to_string(),
            processed,
            meta: Some(meta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_report_omits_meta() {
        let value = serde_json::to_value(DispatchReport::empty()).unwrap();
        assert_eq!(value, json!({ "status": "ok", "processed": 0 }));
    }

    #[test]
    fn test_delivered_report_carries_response() {
        let report = DispatchReport::delivered(3, json!({ "events_received": 3 }));
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value["processed"], 3);
        assert_eq!(value["meta"]["events_received"], 3);
    }
}
