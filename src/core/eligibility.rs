//! Eligibility predicate for candidate rows.

use std::collections::HashSet;

use crate::core::identity::normalize_phone;
use crate::domain::SourceRow;

/// Activity count a session must strictly exceed before it is dispatchable
pub const MESSAGE_THRESHOLD: i64 = 5;

/// Decide whether a source row qualifies as a dispatchable event.
///
/// Rows with an identity that does not normalize, an identity on the
/// exclusion list, or at most [`MESSAGE_THRESHOLD`] messages are expected
/// noise, not errors. Pure and total; check order only affects
/// short-circuiting, not the outcome.
pub fn is_eligible(row: &SourceRow, test_numbers: &HashSet<String>) -> bool {
    let e164 = match row.phone_e164.as_deref().and_then(normalize_phone) {
        Some(e164) => e164,
        None => return false,
    };

    if test_numbers.contains(&e164) {
        return false;
    }

    row.messages_sent > MESSAGE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(phone: Option<&str>, messages_sent: i64) -> SourceRow {
        SourceRow {
            session_id: "s1".to_string(),
            phone_e164: phone.map(str::to_string),
            messages_sent,
            source_url: None,
            experiment_label: None,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let none = HashSet::new();
        assert!(!is_eligible(&row(Some("+15550001111"), 5), &none));
        assert!(is_eligible(&row(Some("+15550001111"), 6), &none));
        assert!(!is_eligible(&row(Some("+15550001111"), 0), &none));
    }

    #[test]
    fn test_unparseable_identity_is_ineligible() {
        let none = HashSet::new();
        assert!(!is_eligible(&row(None, 100), &none));
        assert!(!is_eligible(&row(Some(""), 100), &none));
        assert!(!is_eligible(&row(Some("555-0001"), 100), &none));
    }

    #[test]
    fn test_exclusion_list_wins_regardless_of_count() {
        let excluded: HashSet<String> = ["+15550001111".to_string()].into_iter().collect();
        assert!(!is_eligible(&row(Some("+15550001111"), 100), &excluded));
        // The set is matched against the normalized form
        assert!(!is_eligible(&row(Some("+1 (555) 000-1111"), 100), &excluded));
        // Other numbers are unaffected
        assert!(is_eligible(&row(Some("+15550002222"), 100), &excluded));
    }
}
