use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BASE_BACKOFF_MS: u64 = 200;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn should_retry_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

pub fn next_backoff_ms(attempt: usize) -> u64 {
    let shift = attempt.min(6);
    BASE_BACKOFF_MS.saturating_mul(1_u64 << shift)
}

/// Delay before the next attempt: exponential backoff floored by any
/// `retry-after` hint the provider sent.
pub fn retry_delay_ms(attempt: usize, retry_after_ms: Option<u64>) -> u64 {
    let backoff_ms = next_backoff_ms(attempt);
    match retry_after_ms {
        Some(retry_after_ms) => backoff_ms.max(retry_after_ms),
        None => backoff_ms,
    }
}

pub fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    if delay_ms <= 0 {
        return Some(0);
    }

    u64::try_from(delay_ms).ok()
}

pub fn is_retryable_http_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

pub fn new_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let count = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("amana-{millis}-{count}")
}
