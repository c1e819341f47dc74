//! Trait definitions for the two external collaborators: the generation
//! service and the problem store.
//!
//! Implementations live in `mathtutor-providers` and `mathtutor-store`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ProblemSession, SessionId, Submission};

// ---------------------------------------------------------------------------
// Generation service
// ---------------------------------------------------------------------------

/// A hosted text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate free-form text from a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List models known to this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-2.5-flash").
    pub model: String,
    /// The user prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw generated text. No structure is guaranteed.
    pub text: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

// ---------------------------------------------------------------------------
// Problem store
// ---------------------------------------------------------------------------

/// Persistent record store for sessions and submissions.
///
/// Sessions are keyed uniquely by id; submissions are append-only.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// Persist a new session. Fails if the id is already taken.
    async fn insert_session(&self, session: &ProblemSession) -> anyhow::Result<()>;

    /// Look up a session. `Ok(None)` means no such session.
    async fn fetch_session(&self, id: &SessionId) -> anyhow::Result<Option<ProblemSession>>;

    /// Append a submission.
    async fn insert_submission(&self, submission: &Submission) -> anyhow::Result<()>;

    /// All submissions for a session, oldest first.
    async fn list_submissions(&self, id: &SessionId) -> anyhow::Result<Vec<Submission>>;
}
