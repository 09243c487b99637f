/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - OpenAI: OpenAI API and Azure OpenAI deployments
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider for tests
 *
 * All HTTP clients share the retry loop and client-side rate limiter defined
 * here.
 */

use async_trait::async_trait;
use log::{error, warn};
use parking_lot::Mutex;
use reqwest::{RequestBuilder, Response, StatusCode, header};
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;

    /// Prompt and completion token counts, when the provider reports them
    fn token_usage(response: &Self::Response) -> (Option<u64>, Option<u64>);
}

/// Retry settings shared by the HTTP providers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
    /// Per-request timeout, reported in timeout errors
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            timeout_secs: 120,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms * (1u64 << (attempt.saturating_sub(1)).min(16)))
    }
}

/// Client-side limit of requests per minute
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `None` or zero disables limiting
    pub fn new(requests_per_minute: Option<u32>) -> Self {
        Self {
            interval: requests_per_minute
                .filter(|rpm| *rpm > 0)
                .map(|rpm| Duration::from_millis(60_000 / rpm as u64)),
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next request may be sent
    pub async fn wait(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        let delay = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = next.map_or(now, |t| t.max(now));
            *next = Some(slot + interval);
            slot - now
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Send a request, retrying server errors, network errors and rate limits.
///
/// Server and network errors back off exponentially; 429 waits for
/// `retry-after` when the server sends it. Authentication failures and other
/// client errors return immediately.
pub async fn send_with_retry<F>(
    service: &str,
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    build: F,
) -> Result<Response, ProviderError>
where
    F: Fn() -> RequestBuilder + Send + Sync,
{
    let mut attempt = 0;
    let mut last_error = None;

    while attempt <= policy.max_retries {
        limiter.wait().await;
        let mut delay = None;

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let wait_hint = retry_after(&response);
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to get error response text".to_string());

                if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(
                        "{} rate limit hit - attempt {}/{}",
                        service,
                        attempt + 1,
                        policy.max_retries + 1
                    );
                    delay = wait_hint;
                    last_error = Some(ProviderError::RateLimitExceeded(error_text));
                } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    error!("{} API error ({}): {}", service, status, error_text);
                    return Err(ProviderError::AuthenticationError(error_text));
                } else if status.is_server_error() {
                    // Server error - can retry
                    error!(
                        "{} API error ({}): {} - attempt {}/{}",
                        service,
                        status,
                        error_text,
                        attempt + 1,
                        policy.max_retries + 1
                    );
                    last_error = Some(ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message: error_text,
                    });
                } else {
                    // Client error - don't retry
                    error!("{} API error ({}): {}", service, status, error_text);
                    return Err(ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message: error_text,
                    });
                }
            }
            Err(e) if e.is_timeout() => {
                error!(
                    "{} request timed out - attempt {}/{}",
                    service,
                    attempt + 1,
                    policy.max_retries + 1
                );
                last_error = Some(ProviderError::Timeout(policy.timeout_secs));
            }
            Err(e) => {
                // Network error - can retry
                error!(
                    "{} network error: {} - attempt {}/{}",
                    service,
                    e,
                    attempt + 1,
                    policy.max_retries + 1
                );
                last_error = Some(ProviderError::ConnectionError(e.to_string()));
            }
        }

        attempt += 1;

        // If we have more retries left, wait with exponential backoff
        if attempt <= policy.max_retries {
            tokio::time::sleep(delay.unwrap_or_else(|| policy.backoff(attempt))).await;
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ProviderError::RequestFailed(format!(
            "{} request failed after {} attempts",
            service,
            policy.max_retries + 1
        ))
    }))
}

pub mod anthropic;
pub mod mock;
pub mod openai;
