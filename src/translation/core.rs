/*!
 * Core translation service implementation.
 *
 * This module contains the [`Translator`] seam the pipeline talks to and
 * the [`TranslationService`] that implements it on top of the configured
 * provider: one JSON request per slide, plus a plain-text request for the
 * presentation summary.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::TranslationError;
use crate::providers::Provider;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::openai::OpenAI;
use crate::providers::RetryPolicy;
use crate::translation::mapper::TranslationResponse;
use crate::translation::prompts::{SlidePromptBuilder, build_summary_prompts, parse_translation_response};
use crate::translation::unit::TranslationRequest;

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of requests answered
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }

    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Record one answered request
    pub fn record_request(&mut self, duration: Duration) {
        self.requests += 1;
        self.api_duration += duration;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// The translation service as seen by the deck pipeline
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate every segment of a request in one call
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse, TranslationError>;

    /// Summarize the opening slides of a presentation
    async fn summarize(&self, slides: &[String], target_language: &str) -> Result<String, TranslationError>;

    /// Token usage so far, if the translator tracks it
    fn usage(&self) -> Option<TokenUsageStats> {
        None
    }
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// OpenAI API or an Azure OpenAI deployment
    OpenAI {
        /// Client instance
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },

    /// Scripted provider for tests
    Mock {
        /// Client instance
        client: MockProvider,
    },
}

/// Main translation service for slide translation
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    usage: Mutex<TokenUsageStats>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let retry = RetryPolicy {
            max_retries: config.common.retry_count,
            backoff_base_ms: config.common.retry_backoff_ms,
            timeout_secs: config.get_timeout_secs(),
        };
        let rate_limit = config.get_rate_limit();

        let provider = match config.provider {
            ConfigTranslationProvider::AzureOpenAI => {
                let endpoint = config.get_endpoint();
                if endpoint.is_empty() {
                    return Err(anyhow!("Azure OpenAI endpoint is not configured"));
                }
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::azure(
                        config.get_api_key(),
                        endpoint,
                        config.get_model(),
                        config.get_api_version(),
                        retry,
                        rate_limit,
                    ),
                }
            }
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new(
                    config.get_api_key(),
                    config.get_endpoint(),
                    config.get_model(),
                    retry,
                    rate_limit,
                ),
            },
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(
                    config.get_api_key(),
                    config.get_endpoint(),
                    config.get_model(),
                    retry,
                    rate_limit,
                ),
            },
        };

        let usage = TokenUsageStats::with_provider_info(
            config.provider.display_name().to_string(),
            config.get_model(),
        );

        Ok(Self {
            provider,
            config,
            usage: Mutex::new(usage),
        })
    }

    /// Create a service backed by a mock provider
    pub fn with_mock(config: TranslationConfig, client: MockProvider) -> Self {
        Self {
            provider: TranslationProviderImpl::Mock { client },
            config,
            usage: Mutex::new(TokenUsageStats::with_provider_info("Mock".to_string(), "mock".to_string())),
        }
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<()> {
        let result = match &self.provider {
            TranslationProviderImpl::OpenAI { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Mock { client } => client.test_connection().await,
        };
        result.map_err(|e| anyhow!("Failed to connect to {}: {}", self.config.provider.display_name(), e))
    }

    /// Snapshot of the token usage so far
    pub fn token_usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Send one system/user prompt pair and return the answer text
    async fn complete(
        &self,
        system_prompt: String,
        user_prompt: String,
        temperature: f32,
        json: bool,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let start_time = Instant::now();

        let (text, prompt_tokens, completion_tokens) = match &self.provider {
            TranslationProviderImpl::OpenAI { client } => {
                let mut request = client
                    .request()
                    .add_message("system", system_prompt)
                    .add_message("user", user_prompt)
                    .temperature(temperature);
                if json {
                    request = request.json_mode();
                }
                let response = client.complete(request).await?;
                let (pt, ct) = OpenAI::token_usage(&response);
                (OpenAI::extract_text(&response), pt, ct)
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(client.model(), 4096)
                    .system(system_prompt)
                    .add_message("user", user_prompt)
                    .temperature(temperature);
                let response = client.complete(request).await?;
                let (pt, ct) = Anthropic::token_usage(&response);
                (Anthropic::extract_text(&response), pt, ct)
            }
            TranslationProviderImpl::Mock { client } => {
                let request = MockRequest {
                    system: system_prompt,
                    user: user_prompt,
                    target_language: target_language.to_string(),
                };
                let response = client.complete(request).await?;
                let (pt, ct) = MockProvider::token_usage(&response);
                (MockProvider::extract_text(&response), pt, ct)
            }
        };

        let duration = start_time.elapsed();
        {
            let mut usage = self.usage.lock();
            usage.add_token_usage(prompt_tokens, completion_tokens);
            usage.record_request(duration);
        }
        debug!("{} response received in {:?}", self.config.provider.display_name(), duration);

        if text.trim().is_empty() {
            return Err(TranslationError::Format("provider returned an empty response".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse, TranslationError> {
        let (system_prompt, user_prompt) = SlidePromptBuilder::new(request).build();
        let raw = self
            .complete(
                system_prompt,
                user_prompt,
                self.config.common.temperature,
                true,
                &request.target_language,
            )
            .await?;
        parse_translation_response(&raw)
    }

    async fn summarize(&self, slides: &[String], target_language: &str) -> Result<String, TranslationError> {
        let (system_prompt, user_prompt) = build_summary_prompts(slides, target_language);
        let summary = self
            .complete(
                system_prompt,
                user_prompt,
                self.config.common.summary_temperature,
                false,
                target_language,
            )
            .await?;
        Ok(summary.trim().to_string())
    }

    fn usage(&self) -> Option<TokenUsageStats> {
        Some(self.token_usage())
    }
}
