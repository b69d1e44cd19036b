//! Retry Exhaustion Tests
//!
//! Behavior of the whole-operation retry used by both external clients.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;

use capi_relay::core::retry::{with_retries, RetryPolicy};

/// Same shape as the production schedule, but fast enough for tests
fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn test_exhaustion_after_exact_attempt_count() {
    let attempts = AtomicU32::new(0);

    let result: Result<()> = with_retries(quick_policy(3), "test", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { anyhow::bail!("still down") }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // The last failure is re-raised verbatim
    assert_eq!(err.to_string(), "still down");
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let attempts = AtomicU32::new(0);

    let result = with_retries(quick_policy(3), "test", || {
        let n = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                anyhow::bail!("flaky")
            }
            Ok(n)
        }
    })
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_first_try_success_does_not_retry() {
    let attempts = AtomicU32::new(0);

    let result = with_retries(quick_policy(3), "test", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Ok("done") }
    })
    .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_attempt_policy_never_sleeps() {
    let attempts = AtomicU32::new(0);

    let result: Result<()> = with_retries(quick_policy(1), "test", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { anyhow::bail!("nope") }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
