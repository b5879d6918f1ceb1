use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SourceError;

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Bounded retry for transient failures (connection errors, 429, 5xx).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`, doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Map a final (non-retryable) HTTP failure status to a typed error.
pub fn status_error(status: StatusCode, context: &str, body: &str) -> SourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SourceError::Authentication(format!("{}: {}", context, status))
        }
        StatusCode::NOT_FOUND => SourceError::NotFound(context.to_string()),
        _ => {
            let message: String = format!("{}: {}", context, body.trim()).chars().take(300).collect();
            SourceError::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Send a request, rebuilding it for each attempt.
///
/// Returns the successful response, or the typed error for the last
/// failure. Transient failures that outlast the policy become `Network`.
pub async fn send_with_retry<F>(policy: &RetryPolicy, context: &str, build: F) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let (last_error, wait) = match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(context, status = status.as_u16(), attempt, "Request succeeded");
                    return Ok(response);
                }
                if !is_retryable(status) {
                    let body = response.text().await.unwrap_or_default();
                    return Err(status_error(status, context, &body));
                }
                (format!("{} returned {}", context, status), retry_after(&response))
            }
            Err(e) if e.is_builder() => {
                return Err(SourceError::Config(format!("{}: {}", context, e)));
            }
            Err(e) => (format!("{}: {}", context, e), None),
        };

        if attempt >= policy.max_attempts {
            return Err(SourceError::Network(format!("{} (gave up after {} attempts)", last_error, attempt)));
        }

        let delay = wait.unwrap_or_else(|| policy.delay_for(attempt));
        warn!(
            context,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %last_error,
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
