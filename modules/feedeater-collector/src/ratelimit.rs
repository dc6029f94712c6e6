//! Parses rate-limit feedback from HTTP responses, per spec §5: "the
//! collector parses `Ratelimit-Remaining` / `Ratelimit-Reset` and defers
//! requests until reset when remaining hits zero... On HTTP 429, the
//! collector honors the reset header (or defaults to 60s) and retries."

use std::time::Duration;

use reqwest::header::HeaderMap;

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Returns how long the caller should wait before issuing the next
/// request, or `None` if there's no reason to wait yet.
pub fn defer_until_reset(headers: &HeaderMap) -> Option<Duration> {
    let remaining = header_as_u64(headers, "ratelimit-remaining")?;
    if remaining > 0 {
        return None;
    }
    Some(reset_delay(headers))
}

/// Delay to honor after receiving an HTTP 429, preferring the response's
/// own reset/Retry-After header and falling back to a fixed default.
pub fn retry_after_429(headers: &HeaderMap) -> Duration {
    header_as_u64(headers, "retry-after")
        .map(Duration::from_secs)
        .unwrap_or_else(|| reset_delay(headers))
}

fn reset_delay(headers: &HeaderMap) -> Duration {
    header_as_u64(headers, "ratelimit-reset")
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn header_as_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn defer_until_reset_none_when_remaining() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-remaining", HeaderValue::from_static("5"));
        assert_eq!(defer_until_reset(&headers), None);
    }

    #[test]
    fn defer_until_reset_uses_reset_header_when_exhausted() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("ratelimit-reset", HeaderValue::from_static("12"));
        assert_eq!(defer_until_reset(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn retry_after_429_defaults_to_60s_without_headers() {
        let headers = HeaderMap::new();
        assert_eq!(retry_after_429(&headers), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn retry_after_429_honors_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("5"));
        assert_eq!(retry_after_429(&headers), Duration::from_secs(5));
    }
}
