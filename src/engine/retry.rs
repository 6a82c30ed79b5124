use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::{config, error::RemoteError, warning};

/// How often a rate-limited call is attempted before giving up.
///
/// The delay between attempts is not configured here: it is whatever the
/// service sent in its `Retry-After` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: config::MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Executes `call`, retrying only on [`RemoteError::RateLimited`].
    ///
    /// The backoff is an async sleep, so only the calling task waits; other
    /// fan-out tasks keep running. Any other error is returned on the spot.
    /// The attempt counter belongs to this one call.
    ///
    /// # Errors
    ///
    /// - The first non rate-limit error, unchanged.
    /// - [`RemoteError::RetryExhausted`] carrying the last rate-limit error
    ///   once `max_attempts` attempts were rate limited.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(RemoteError::RateLimited { retry_after }) if attempt < max_attempts => {
                    warning!(
                        "Rate limited on {}, retrying in {}s (attempt {}/{})",
                        operation,
                        retry_after.as_secs(),
                        attempt,
                        max_attempts
                    );
                    sleep(retry_after).await;
                }
                Err(err @ RemoteError::RateLimited { .. }) => {
                    return Err(RemoteError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Parses a `Retry-After` header value given in seconds.
///
/// Falls back to one second when the header is missing or not a number so
/// a malformed response never turns into a hot retry loop.
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(1))
}
