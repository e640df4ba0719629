//! # Resilient request executor
//!
//! Every call to GitHub leaves the process through [`RequestExecutor`]. It
//! keeps two independent backoff tracks:
//!
//! - a rate-limited `403` waits for the server's `Retry-After` hint (or a
//!   linear fallback) and does not advance the exponential counter;
//! - any other failure waits `base_backoff * 2^failures`.
//!
//! Both tracks draw from the same `max_attempts` budget.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::error::{GitHubAppError, Result, TransportError};

/// Attempts per request when the caller does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base unit for both backoff tracks.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound for a single request, connect included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("discussion-labeler/", env!("CARGO_PKG_VERSION"));

const RATE_LIMIT_MARKER: &str = "rate limit";

/// Retry budget and backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Wait applied to a rate-limited attempt when no `Retry-After` is sent.
    /// `attempt` is zero-based.
    #[must_use]
    pub fn rate_limit_wait(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt.saturating_add(1))
    }

    /// Exponential wait after the `failures`-th hard failure (zero-based).
    #[must_use]
    pub fn failure_backoff(&self, failures: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2_u32.saturating_pow(failures))
    }
}

/// HTTP executor with bounded retry.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Build an executor with its own client bounded by `timeout`.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(TransportError::from)?;

        Ok(Self { client, policy })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute with the policy's default attempt budget.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        self.execute_with_attempts(method, url, headers, body, self.policy.max_attempts)
            .await
    }

    /// Execute `method url`, retrying rate limits and transport failures.
    ///
    /// Only `GET`, `POST` and `PATCH` are accepted. A 2xx response is returned
    /// as soon as it arrives. Once `max_attempts` tries are spent the last
    /// hard failure is returned; if every try was rate limited the error is
    /// [`TransportError::RateLimited`].
    #[instrument(skip(self, headers, body), fields(method = %method, url = %url))]
    pub async fn execute_with_attempts(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
        max_attempts: u32,
    ) -> Result<Response> {
        if ![Method::GET, Method::POST, Method::PATCH].contains(&method) {
            return Err(GitHubAppError::UnsupportedMethod(method));
        }

        let mut attempt = 0_u32;
        let mut failures = 0_u32;
        let mut rate_limited = false;
        let mut last_failure: Option<TransportError> = None;

        while attempt < max_attempts {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            let failure = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(status = %response.status(), attempt = attempt + 1, "Request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let retry_after = parse_retry_after(response.headers());
                    let text = response.text().await.unwrap_or_default();

                    if is_rate_limited(status, &text) {
                        let wait =
                            retry_after.unwrap_or_else(|| self.policy.rate_limit_wait(attempt));
                        attempt += 1;
                        rate_limited = true;
                        warn!(
                            attempt,
                            max_attempts,
                            wait_secs = wait.as_secs_f64(),
                            "Rate limit exceeded"
                        );
                        if attempt < max_attempts {
                            sleep(wait).await;
                        }
                        continue;
                    }

                    TransportError::Status {
                        status: status.as_u16(),
                        body: text,
                    }
                }
                Err(e) => TransportError::Request(e),
            };

            attempt += 1;
            warn!(
                attempt,
                max_attempts,
                timeout = failure.is_timeout(),
                error = %failure,
                "Request failed"
            );
            if attempt < max_attempts {
                sleep(self.policy.failure_backoff(failures)).await;
            }
            failures += 1;
            last_failure = Some(failure);
        }

        let err = match last_failure {
            Some(failure) => failure,
            None if rate_limited => TransportError::RateLimited { attempts: attempt },
            None => TransportError::Exhausted,
        };
        error!(attempts = attempt, error = %err, "All retry attempts failed");
        Err(err.into())
    }
}

/// A 403 (or 429) whose body mentions the rate limit.
fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) && body.to_lowercase().contains(RATE_LIMIT_MARKER)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
