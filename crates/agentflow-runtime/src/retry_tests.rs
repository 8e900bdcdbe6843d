use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, PartialEq)]
enum CallError {
    Transient,
    Fatal,
}

impl Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn fast(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_delay: Duration::from_millis(1),
        ..Default::default()
    }
}

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.base_delay, Duration::from_millis(500));
    assert_eq!(config.backoff_multiplier, 2.0);
    assert!(!config.jitter);
}

#[test]
fn test_default_backoff_doubles_from_half_second() {
    let config = RetryConfig::default();
    assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
    assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
    assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
}

#[test]
fn test_delay_capped_by_max() {
    let config = RetryConfig {
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(500),
        ..Default::default()
    };
    // 100 * 2^3 = 800, capped at 500
    assert_eq!(config.delay_for_attempt(3), Duration::from_millis(500));
}

#[test]
fn test_delay_with_jitter_stays_near_base() {
    let config = RetryConfig {
        base_delay: Duration::from_millis(100),
        backoff_multiplier: 1.0,
        jitter: true,
        ..Default::default()
    };
    let delay = config.delay_for_attempt(0).as_millis();
    assert!((90..=110).contains(&delay));
}

#[tokio::test]
async fn test_success_after_two_failures_takes_three_calls() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<&str, CallError> = with_retry(&fast(3), || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CallError::Transient)
            } else {
                Ok("ok")
            }
        }
    })
    .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_return_original_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<(), CallError> = with_retry(&fast(1), || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CallError::Transient)
        }
    })
    .await;

    assert_eq!(result, Err(CallError::Transient));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_first_try_success_calls_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<u32, CallError> = with_retry(&fast(3), || {
        let counter = counter.clone();
        async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
    })
    .await;

    assert_eq!(result, Ok(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_retryable_error_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<(), CallError> = with_retry_if(
        &fast(3),
        |e| *e == CallError::Transient,
        || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CallError::Fatal)
            }
        },
    )
    .await;

    assert_eq!(result, Err(CallError::Fatal));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_retries_calls_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<(), CallError> = with_retry(&fast(0), || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CallError::Transient)
        }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
