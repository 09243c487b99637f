/*!
 * Chat completions client for OpenAI and Azure OpenAI.
 *
 * Both services speak the same request and response format and differ only
 * in URL layout and authentication header, captured by [`ApiStyle`].
 */

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{Provider, RateLimiter, RetryPolicy, send_with_retry};
use crate::errors::ProviderError;

/// How requests are addressed and authenticated
#[derive(Debug, Clone, PartialEq)]
pub enum ApiStyle {
    /// `{endpoint}/chat/completions` with a bearer token
    Standard,
    /// `{endpoint}/openai/deployments/{deployment}/chat/completions` with an `api-key` header
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// OpenAI-compatible chat client
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    style: ApiStyle,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIRequest {
    /// Model name; Azure selects the model by deployment instead
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,

    messages: Vec<OpenAIMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    /// Forces a JSON object answer
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl OpenAIRequest {
    /// Create a new request; pass an empty model for Azure deployments
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            model: Some(model).filter(|m| !m.is_empty()),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask for a JSON object answer
    pub fn json_mode(mut self) -> Self {
        self.response_format = Some(ResponseFormat {
            format_type: "json_object".to_string(),
        });
        self
    }
}

impl OpenAI {
    /// Create a client for the public OpenAI API or a compatible server
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        retry: RetryPolicy,
        rate_limit: Option<u32>,
    ) -> Self {
        Self::with_style(api_key, endpoint, model, ApiStyle::Standard, retry, rate_limit)
    }

    /// Create a client for an Azure OpenAI deployment
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        retry: RetryPolicy,
        rate_limit: Option<u32>,
    ) -> Self {
        let deployment = deployment.into();
        let style = ApiStyle::Azure {
            deployment: deployment.clone(),
            api_version: api_version.into(),
        };
        Self::with_style(api_key, endpoint, deployment, style, retry, rate_limit)
    }

    fn with_style(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        style: ApiStyle,
        retry: RetryPolicy,
        rate_limit: Option<u32>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(retry.timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            style,
            retry,
            limiter: RateLimiter::new(rate_limit),
        }
    }

    /// Model name, or the deployment name for Azure
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn style(&self) -> &ApiStyle {
        &self.style
    }

    /// Build a request addressed the way this client's service expects
    pub fn request(&self) -> OpenAIRequest {
        match self.style {
            ApiStyle::Standard => OpenAIRequest::new(self.model.clone()),
            ApiStyle::Azure { .. } => OpenAIRequest::new(""),
        }
    }

    fn api_url(&self) -> Result<String, ProviderError> {
        let base = if self.endpoint.is_empty() {
            "https://api.openai.com/v1"
        } else {
            self.endpoint.trim_end_matches('/')
        };

        match &self.style {
            ApiStyle::Standard => Ok(format!("{}/chat/completions", base)),
            ApiStyle::Azure {
                deployment,
                api_version,
            } => {
                let mut url = Url::parse(&format!(
                    "{}/openai/deployments/{}/chat/completions",
                    base, deployment
                ))
                .map_err(|e| ProviderError::RequestFailed(format!("Invalid Azure endpoint '{}': {}", base, e)))?;
                url.query_pairs_mut().append_pair("api-version", api_version);
                Ok(url.to_string())
            }
        }
    }

    fn service_name(&self) -> &'static str {
        match self.style {
            ApiStyle::Standard => "OpenAI",
            ApiStyle::Azure { .. } => "Azure OpenAI",
        }
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = OpenAIRequest;
    type Response = OpenAIResponse;

    async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let api_url = self.api_url()?;
        let service = self.service_name();

        let response = send_with_retry(service, &self.retry, &self.limiter, || {
            let builder = self
                .client
                .post(&api_url)
                .header(header::CONTENT_TYPE, "application/json")
                .json(&request);
            match self.style {
                ApiStyle::Standard => builder.bearer_auth(&self.api_key),
                ApiStyle::Azure { .. } => builder.header("api-key", &self.api_key),
            }
        })
        .await?;

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse {} response: {}", service, e)))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = self.request().add_message("user", "Hello").max_tokens(10);
        self.complete(request).await?;
        Ok(())
    }

    fn extract_text(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default()
    }

    fn token_usage(response: &OpenAIResponse) -> (Option<u64>, Option<u64>) {
        match &response.usage {
            Some(usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
            None => (None, None),
        }
    }
}
