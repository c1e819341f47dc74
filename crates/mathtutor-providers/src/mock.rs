//! Mock provider for tests and offline runs.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mathtutor_core::error::ProviderError;
use mathtutor_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

/// Problems handed out in rotation by [`MockProvider::tutor`].
const CANNED_PROBLEMS: &[&str] = &[
    r#"{"problem_text": "A shop sells pencils in packs of 12. Mrs Tan buys 7 packs. How many pencils does she buy?", "final_answer": 84}"#,
    r#"{"problem_text": "Ravi has 250 stickers. He gives 38 to his sister and 47 to his friend. How many stickers does he have left?", "final_answer": 165}"#,
    r#"{"problem_text": "A ribbon 3 m long is cut into pieces of 25 cm each. How many pieces are there?", "final_answer": 12}"#,
];

const CANNED_CORRECT_FEEDBACK: &str = r#"{"feedback_text": "Fantastic work! You nailed that problem and showed great problem-solving skills! Keep challenging yourself!"}"#;
const CANNED_INCORRECT_FEEDBACK: &str = r#"{"feedback_text": "That was a good try! Remember to check your multiplication/division steps, as your answer is close but not quite right. You can do this!"}"#;

/// A mock generation service.
///
/// Returns configurable responses based on prompt content matching; the
/// first rule whose key appears in the prompt wins.
pub struct MockProvider {
    /// Ordered prompt substring → response text rules.
    responses: Vec<(String, String)>,
    /// Default response if no rule matches.
    default_response: String,
    /// Responses cycled through, in place of the default, when no rule matches.
    rotation: Vec<String>,
    /// When set, every call fails with this error.
    failure: Option<ProviderError>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Position in `rotation`; only advanced by calls that fall through to it.
    next_rotation: AtomicUsize,
    /// Last request received.
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock with the given prompt→response rules.
    pub fn new(responses: Vec<(String, String)>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            rotation: Vec::new(),
            failure: None,
            call_count: AtomicU32::new(0),
            next_rotation: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(Vec::new())
        }
    }

    /// Create a mock whose every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(Vec::new())
        }
    }

    /// Canned tutor: problems for problem prompts, cheerful or corrective
    /// feedback for feedback prompts.
    pub fn tutor() -> Self {
        Self {
            rotation: CANNED_PROBLEMS.iter().map(|p| p.to_string()).collect(),
            ..Self::new(vec![
                (
                    "correctly answered".to_string(),
                    CANNED_CORRECT_FEEDBACK.to_string(),
                ),
                (
                    "The correct answer is".to_string(),
                    CANNED_INCORRECT_FEEDBACK.to_string(),
                ),
            ])
        }
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        if let Some(error) = &self.failure {
            return Err(error.clone().into());
        }

        let text = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| {
                if self.rotation.is_empty() {
                    self.default_response.clone()
                } else {
                    let next = self.next_rotation.fetch_add(1, Ordering::Relaxed);
                    self.rotation[next % self.rotation.len()].clone()
                }
            });

        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (text.len() / 4) as u32;

        Ok(GenerateResponse {
            text,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}
