//! Dispatch orchestrator.
//!
//! Sequences one run: fetch -> filter -> dedup-check -> build -> deliver ->
//! commit -> report. Ledger entries are committed only after the delivery
//! call reports success, so a failed run leaves the whole batch eligible
//! for the next trigger.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::adapters::{EventSink, RowSource};
use crate::core::eligibility::is_eligible;
use crate::core::identity::{hash_identity, normalize_phone};
use crate::domain::{ConversionEvent, DedupKey, DispatchReport};
use crate::ledger::{Ledger, LedgerError};

/// A run-level failure.
///
/// There is no partial success between build and commit; the caller
/// re-invokes the whole pipeline on the next trigger, and the ledger makes
/// that rerun safe.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Analytics source unreachable or returned a malformed response
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(anyhow::Error),

    /// Downstream rejected the batch after retries were exhausted
    #[error("delivery failed: {0}")]
    Delivery(anyhow::Error),

    /// The dedup store failed during check or commit; a failed check is
    /// never treated as "not yet dispatched"
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

/// Composes the source, filter, ledger, and sink into one idempotent run.
pub struct Dispatcher<'a> {
    source: &'a dyn RowSource,
    ledger: &'a dyn Ledger,
    sink: &'a dyn EventSink,

    /// Internal/test identities excluded from dispatch (normalized E.164)
    test_numbers: HashSet<String>,

    /// Action-source tag stamped on every outbound event
    action_source: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        source: &'a dyn RowSource,
        ledger: &'a dyn Ledger,
        sink: &'a dyn EventSink,
        test_numbers: HashSet<String>,
        action_source: impl Into<String>,
    ) -> Self {
        Self {
            source,
            ledger,
            sink,
            test_numbers,
            action_source: action_source.into(),
        }
    }

    /// Execute one dispatch run.
    #[instrument(skip(self), fields(source = self.source.name(), sink = self.sink.name()))]
    pub async fn run(&self) -> Result<DispatchReport, DispatchError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "starting dispatch run");

        let rows = self
            .source
            .fetch_rows()
            .await
            .map_err(DispatchError::UpstreamFetch)?;

        let total = rows.len();
        let eligible: Vec<_> = rows
            .into_iter()
            .filter(|row| is_eligible(row, &self.test_numbers))
            .collect();
        debug!(%run_id, total, eligible = eligible.len(), "filtered candidate rows");

        let event_time = Utc::now().timestamp();
        let mut batch: BTreeMap<DedupKey, ConversionEvent> = BTreeMap::new();

        for row in eligible {
            // Eligibility already proved this normalizes
            let e164 = match row.phone_e164.as_deref().and_then(normalize_phone) {
                Some(e164) => e164,
                None => continue,
            };

            let key = DedupKey::new(&row.session_id, row.experiment_label.as_deref());

            if self.ledger.exists(&key).await? {
                debug!(%run_id, session = %row.session_id, "already dispatched, skipping");
                continue;
            }

            let event = ConversionEvent::build(
                &key,
                hash_identity(&e164),
                row.messages_sent,
                row.source_url,
                &self.action_source,
                event_time,
            );

            // Rows sharing a key within this run collapse onto the last one
            batch.insert(key, event);
        }

        if batch.is_empty() {
            info!(%run_id, "nothing to dispatch");
            return Ok(DispatchReport::empty());
        }

        let events: Vec<ConversionEvent> = batch.values().cloned().collect();
        let response = self
            .sink
            .send(&events)
            .await
            .map_err(DispatchError::Delivery)?;

        // Delivery is confirmed; only now do the markers become durable
        let now = Utc::now();
        for key in batch.keys() {
            self.ledger.mark_dispatched(key, now).await?;
        }

        info!(%run_id, processed = events.len(), "dispatch run completed");
        Ok(DispatchReport::delivered(events.len(), response))
    }
}
