//! Identity normalization, hashing, and event identifiers.
//!
//! Pure functions, no I/O. [`hash_identity`] output is the only
//! identity-derived value the rest of the pipeline may transmit; raw
//! identifiers stop at this boundary.

use sha2::{Digest, Sha256};

/// Namespace prefix for downstream event identifiers
pub const EVENT_NAMESPACE: &str = "chat-threshold";

/// Canonicalize a raw contact identifier into E.164 form.
///
/// Returns `None` for empty input, input without a leading `+`, or anything
/// that is not 8-16 digits once formatting characters are stripped.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('+') {
        return None;
    }

    // Keep digits and any '+' so a stray plus mid-string fails validation
    let stripped: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let digits = stripped.strip_prefix('+')?;
    if digits.len() < 8 || digits.len() > 16 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(stripped)
}

/// One-way digest of a normalized identity, rendered as lowercase hex.
///
/// The leading `+` is stripped first so the token matches what the
/// attribution API expects for phone identifiers.
pub fn hash_identity(e164: &str) -> String {
    let stripped = e164.strip_prefix('+').unwrap_or(e164);
    let canonical = stripped.trim().to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Deterministic downstream identifier for a `(session, experiment)` pair.
///
/// Identical inputs produce the identical identifier across runs and
/// processes; the receiving API dedupes on this value as a second line of
/// defense beyond the ledger.
pub fn event_id_for(session_id: &str, experiment_label: Option<&str>) -> String {
    let label = experiment_label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or("default");

    format!("{}:{}:{}", EVENT_NAMESPACE, label, session_id)
}
