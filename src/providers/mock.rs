/*!
 * In-process provider for tests and offline runs.
 *
 * Each behavior stands in for one way a chat service can answer:
 * - `MockProvider::working()` - Always succeeds, echoing every segment as translated
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Every request is rejected
 * - `MockProvider::dropping()` - Answers but leaves out the last segment
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::translation::mapper::TranslationResponse;
use crate::translation::prompts::templates::PromptRequest;

/// Prompt pair as the mock receives it
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// System prompt
    pub system: String,
    /// User prompt; JSON for slide requests, plain text for summaries
    pub user: String,
    /// Target language
    pub target_language: String,
}

/// Answer produced by the mock
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The answer text
    pub text: String,
    /// Simulated prompt tokens
    pub prompt_tokens: Option<u64>,
    /// Simulated completion tokens
    pub completion_tokens: Option<u64>,
}

/// How the mock answers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Echoes every segment back as translated
    Working,
    /// Succeeds but omits the last segment of multi-segment requests
    DropLast,
    /// Rejects every Nth request
    Intermittent { fail_every: usize },
    /// Every request is rejected with an API error
    Failing,
    /// Returns text that is not JSON
    Malformed,
    /// Answers with an empty string
    Empty,
    /// Answers after a delay
    Slow { delay_ms: u64 },
}

/// Provider answering from memory
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
    /// Replaces the echo when set
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockProvider {
        pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Mock that echoes every segment
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that leaves the last segment unanswered
    pub fn dropping() -> Self {
        Self::new(MockBehavior::DropLast)
    }

    /// Mock that rejects every `fail_every`-th request
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Mock that rejects every request
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Mock that answers with nothing
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Answer every request with `generator` instead of the echo
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Echo every segment as `[lang] text`, keeping style tags from the hint.
    ///
    /// Requests that are not slide JSON (summaries) get a fixed summary.
    pub fn echo_response(request: &MockRequest, drop_last: bool) -> String {
        let Ok(prompt) = serde_json::from_str::<PromptRequest>(&request.user) else {
            return "A presentation used for testing.".to_string();
        };

        let mut segments = prompt.segments;
        if drop_last && segments.len() > 1 {
            segments.pop();
        }
        let response = TranslationResponse::from_pairs(segments.into_iter().map(|s| {
            let text = s.style_hint.unwrap_or(s.text);
            (s.slot_id, format!("[{}] {}", request.target_language, text))
        }));
        serde_json::to_string(&response).unwrap_or_default()
    }

    fn answer(&self, request: &MockRequest, drop_last: bool) -> MockResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => Self::echo_response(request, drop_last),
        };
        MockResponse {
            prompt_tokens: Some((request.system.len() + request.user.len()) as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.answer(&request, false)),

            MockBehavior::DropLast => Ok(self.answer(&request, true)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.answer(&request, false))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "mock provider rejects every request".to_string(),
                status_code: 500,
            }),

            MockBehavior::Malformed => Ok(MockResponse {
                text: "I'm sorry, I can only translate one paragraph at a time.".to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(12),
            }),

            MockBehavior::Empty => Ok(MockResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.answer(&request, false))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }

    fn token_usage(response: &Self::Response) -> (Option<u64>, Option<u64>) {
        (response.prompt_tokens, response.completion_tokens)
    }
}
