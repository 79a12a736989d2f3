use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::{sleep, Duration};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt as u32).min(12);
        let scaled = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(scaled.min(self.max_delay_ms.max(self.base_delay_ms)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
        }
    }
}

/// Rate limits and server-side failures are worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Sends the request, retrying transient failures. The final response is
/// returned as-is, whatever its status; the caller decides what a non-2xx
/// means.
pub async fn send_with_retry(
    builder: RequestBuilder,
    policy: &RetryPolicy,
    operation: &str,
) -> Result<Response> {
    let total_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let request = builder.try_clone().ok_or_else(|| {
            Error::Provider(format!("{operation} cannot be retried: request body is a stream"))
        })?;
        let is_last = attempt + 1 >= total_attempts;

        match request.send().await {
            Ok(response) if is_retryable_status(response.status()) && !is_last => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    status = %response.status(),
                    attempt,
                    total_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "model endpoint returned a retryable status"
                );
                sleep(delay).await;
            }
            Ok(response) => return Ok(response),
            Err(err) if is_retryable_transport_error(&err) && !is_last => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    error = %err,
                    attempt,
                    total_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "model endpoint request failed; retrying"
                );
                sleep(delay).await;
            }
            Err(err) => {
                return Err(Error::Provider(format!(
                    "{operation} failed after {} attempt(s): {err}",
                    attempt + 1
                )));
            }
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 500,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn only_rate_limits_and_server_errors_are_retryable() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }
}
