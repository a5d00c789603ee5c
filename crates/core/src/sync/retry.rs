//! Retry classification and backoff for remote failures.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Retry policy classification for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

/// Classify a sync error for the queue's retry decision.
pub fn classify_error(error: &Error) -> SyncRetryClass {
    match error {
        Error::AuthExpired(_) | Error::MissingRefreshToken => SyncRetryClass::ReauthRequired,
        Error::RemoteTransport(_) | Error::Storage(_) => SyncRetryClass::Retryable,
        Error::RemoteApi { code, .. } if is_transient_api_code(code) => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

fn is_transient_api_code(code: &str) -> bool {
    matches!(
        code,
        "UNABLE_TO_LOCK_ROW" | "REQUEST_LIMIT_EXCEEDED" | "SERVER_UNAVAILABLE" | "QUERY_TIMEOUT"
    )
}

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(consecutive_failures: u32) -> i64 {
    const MAX_EXPONENT: u32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    2_i64.pow(consecutive_failures.min(MAX_EXPONENT)) * BASE_DELAY_SECONDS
}

/// [`backoff_seconds`] plus up to 20% random jitter.
pub fn jittered_backoff_seconds(consecutive_failures: u32) -> i64 {
    let backoff = backoff_seconds(consecutive_failures);
    let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
    backoff.saturating_add(jitter)
}
