//! Problem lifecycle controller.
//!
//! Orchestrates generate → parse → persist for new problems, and
//! lookup → grade → feedback → persist for answers. Generation and lookup
//! failures are returned as [`LifecycleError`]s; feedback failures and store
//! write failures are logged and absorbed so that a graded answer always
//! produces a response.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{LifecycleError, ProviderError};
use crate::grading::{grade, parse_user_answer, resolve_correct_answer};
use crate::model::{
    AnswerSubmission, FeedbackSource, ProblemSession, SessionId, Submission, SubmissionOutcome,
};
use crate::parser::{parse_feedback, parse_problem};
use crate::prompts::{fallback_feedback, feedback_prompt, DEFAULT_SYSTEM_PROMPT, PROBLEM_PROMPT};
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider, ProblemStore};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Configuration for the lifecycle controller.
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Max tokens per generation call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// System prompt sent with every call.
    pub system_prompt: Option<String>,
    /// Prompt used when a problem is requested without one.
    pub problem_prompt: String,
    /// Retries on transient provider errors.
    pub max_retries: u32,
    /// Initial delay between retries; doubles each time.
    pub retry_delay: Duration,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            problem_prompt: PROBLEM_PROMPT.to_string(),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// The lifecycle controller. Holds its collaborators explicitly so they can
/// be swapped for test doubles.
pub struct TutorEngine {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ProblemStore>,
    config: TutorConfig,
}

impl TutorEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ProblemStore>,
        config: TutorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    /// Send a prompt to the generation service and return its raw text.
    pub async fn generate_text(&self, prompt: &str) -> Result<GenerateResponse, LifecycleError> {
        if prompt.trim().is_empty() {
            return Err(LifecycleError::MissingField("prompt"));
        }
        self.call_provider(prompt)
            .await
            .map_err(LifecycleError::Generation)
    }

    /// Generate a problem, parse it, and persist it as a new session.
    ///
    /// Falls back to the configured problem prompt when `prompt` is `None`
    /// or blank. A failed session write is logged, not returned.
    pub async fn generate_problem(
        &self,
        prompt: Option<&str>,
    ) -> Result<ProblemSession, LifecycleError> {
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(self.config.problem_prompt.as_str());

        let response = self.generate_text(prompt).await?;
        let problem = parse_problem(&response.text).map_err(|e| {
            warn!("could not parse problem from generated text: {e}");
            debug!(text = %response.text, "unparsable generation output");
            LifecycleError::UnparsableProblem(e)
        })?;

        let session = ProblemSession::new(problem);
        match self.store.insert_session(&session).await {
            Ok(()) => info!(session_id = %session.id, "problem session created"),
            Err(e) => error!(session_id = %session.id, "failed to persist session: {e:#}"),
        }
        Ok(session)
    }

    /// Grade an answer, request feedback, and record the submission.
    pub async fn submit_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<SubmissionOutcome, LifecycleError> {
        let session_id = &submission.session_id;
        if session_id.as_str().trim().is_empty() {
            return Err(LifecycleError::MissingField("sessionId"));
        }

        let user_answer = parse_user_answer(&submission.user_answer);

        let session = match self.store.fetch_session(session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(%session_id, "no correct answer found for session");
                return Err(LifecycleError::SessionNotFound(session_id.clone()));
            }
            Err(e) => {
                error!(%session_id, "session lookup failed: {e:#}");
                return Err(LifecycleError::SessionLookup {
                    id: session_id.clone(),
                    source: e,
                });
            }
        };

        let correct_answer = resolve_correct_answer(session.correct_answer);
        let is_correct = correct_answer.is_some_and(|answer| grade(user_answer, answer));
        let prompt_answer = correct_answer.unwrap_or_else(|| {
            warn!(%session_id, "stored correct answer is not a number, using 0 in feedback");
            0.0
        });
        debug!(%session_id, user_answer, is_correct, "answer graded");

        let problem_text = if submission.problem_text.trim().is_empty() {
            session.problem_text.as_str()
        } else {
            submission.problem_text.as_str()
        };
        let (feedback_text, feedback_source) = self
            .request_feedback(problem_text, user_answer, prompt_answer, is_correct)
            .await;

        let record = Submission {
            session_id: session_id.clone(),
            user_answer,
            is_correct,
            feedback_text: feedback_text.clone(),
            submitted_at: Utc::now(),
        };
        match self.store.insert_submission(&record).await {
            Ok(()) => info!(%session_id, is_correct, %feedback_source, "submission saved"),
            Err(e) => error!(%session_id, "failed to save submission: {e:#}"),
        }

        Ok(SubmissionOutcome {
            feedback_text,
            is_correct,
            user_answer,
            correct_answer,
            feedback_source,
        })
    }

    /// Submissions recorded for a session, oldest first.
    pub async fn history(&self, session_id: &SessionId) -> anyhow::Result<Vec<Submission>> {
        self.store.list_submissions(session_id).await
    }

    async fn request_feedback(
        &self,
        problem_text: &str,
        user_answer: f64,
        correct_answer: f64,
        is_correct: bool,
    ) -> (String, FeedbackSource) {
        let prompt = feedback_prompt(problem_text, user_answer, correct_answer, is_correct);

        let source = match self.call_provider(&prompt).await {
            Ok(response) => match parse_feedback(&response.text) {
                Ok(payload) => return (payload.feedback_text, FeedbackSource::Generated),
                Err(e) => {
                    warn!("feedback parsing failed, using default feedback: {e}");
                    FeedbackSource::ParseFallback
                }
            },
            Err(e) => {
                warn!("feedback generation failed, using default feedback: {e:#}");
                FeedbackSource::ServiceFallback
            }
        };
        (fallback_feedback(is_correct, correct_answer, source), source)
    }

    /// Call the provider, retrying transient failures with exponential backoff.
    async fn call_provider(&self, prompt: &str) -> anyhow::Result<GenerateResponse> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            system_prompt: self.config.system_prompt.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut retry_delay = self.config.retry_delay.min(MAX_RETRY_DELAY);
        let mut attempt = 0u32;
        loop {
            match self.provider.generate(&request).await {
                Ok(response) => {
                    debug!(
                        provider = self.provider.name(),
                        model = %response.model,
                        latency_ms = response.latency_ms,
                        total_tokens = response.token_usage.total_tokens,
                        "generation complete"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let (transient, retry_after) = match e.downcast_ref::<ProviderError>() {
                        Some(p) => (p.is_transient(), p.retry_after_ms()),
                        None => (false, None),
                    };
                    if !transient || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = retry_after
                        .map(Duration::from_millis)
                        .unwrap_or(retry_delay);
                    warn!(attempt, ?delay, "generation failed, retrying: {e:#}");
                    tokio::time::sleep(delay).await;
                    retry_delay = retry_delay.saturating_mul(2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::traits::{ModelInfo, TokenUsage};

    /// Provider that replays scripted results in order and records prompts.
    struct ScriptedProvider {
        script: Mutex<VecDeque<anyhow::Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<anyhow::Result<String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")));
            next.map(|text| GenerateResponse {
                text,
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 1,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    #[derive(Default)]
    struct TestStore {
        sessions: Mutex<HashMap<SessionId, ProblemSession>>,
        submissions: Mutex<Vec<Submission>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl ProblemStore for TestStore {
        async fn insert_session(&self, session: &ProblemSession) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail_writes, "store offline");
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id.clone(), session.clone());
            Ok(())
        }

        async fn fetch_session(&self, id: &SessionId) -> anyhow::Result<Option<ProblemSession>> {
            anyhow::ensure!(!self.fail_reads, "store offline");
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }

        async fn insert_submission(&self, submission: &Submission) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail_writes, "store offline");
            self.submissions.lock().unwrap().push(submission.clone());
            Ok(())
        }

        async fn list_submissions(&self, id: &SessionId) -> anyhow::Result<Vec<Submission>> {
            Ok(self
                .submissions
                .lock()
                .unwrap()
                .iter()
                .filter(|s| &s.session_id == id)
                .cloned()
                .collect())
        }
    }

    fn config() -> TutorConfig {
        TutorConfig {
            retry_delay: Duration::ZERO,
            ..TutorConfig::default()
        }
    }

    fn engine(
        script: Vec<anyhow::Result<String>>,
        store: TestStore,
    ) -> (Arc<ScriptedProvider>, Arc<TestStore>, TutorEngine) {
        let provider = Arc::new(ScriptedProvider::new(script));
        let store = Arc::new(store);
        let engine = TutorEngine::new(provider.clone(), store.clone(), config());
        (provider, store, engine)
    }

    fn seeded_store(correct_answer: f64) -> (SessionId, TestStore) {
        let store = TestStore::default();
        let id = SessionId::from("session-1");
        store.sessions.lock().unwrap().insert(
            id.clone(),
            ProblemSession {
                id: id.clone(),
                problem_text: "2+2?".into(),
                correct_answer,
                created_at: Utc::now(),
            },
        );
        (id, store)
    }

    fn answer(id: &SessionId, user_answer: &str) -> AnswerSubmission {
        AnswerSubmission {
            session_id: id.clone(),
            problem_text: "2+2?".into(),
            user_answer: user_answer.into(),
        }
    }

    #[tokio::test]
    async fn generate_problem_persists_session() {
        let (provider, store, engine) = engine(
            vec![Ok(r#"Here: {"problem_text":"2+2?","final_answer":4}"#.into())],
            TestStore::default(),
        );

        let session = engine.generate_problem(None).await.unwrap();
        assert_eq!(session.correct_answer, 4.0);
        assert_eq!(provider.prompts(), vec![PROBLEM_PROMPT.to_string()]);

        let stored = store.sessions.lock().unwrap().get(&session.id).cloned();
        assert_eq!(stored, Some(session));
    }

    #[tokio::test]
    async fn unparsable_problem_persists_nothing() {
        let (_, store, engine) = engine(
            vec![Ok("Sorry, I can't help with that.".into())],
            TestStore::default(),
        );

        let err = engine.generate_problem(Some("make a problem")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::UnparsableProblem(_)));
        assert!(store.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let (_, store, engine) = engine(
            vec![
                Err(ProviderError::NetworkError("reset".into()).into()),
                Err(ProviderError::NetworkError("reset".into()).into()),
                Err(ProviderError::NetworkError("reset".into()).into()),
            ],
            TestStore::default(),
        );

        let err = engine.generate_problem(None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Generation(_)));
        assert!(store.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_write_failure_still_returns_problem() {
        let store = TestStore {
            fail_writes: true,
            ..TestStore::default()
        };
        let (_, _, engine) = engine(
            vec![Ok(r#"{"problem_text":"5*5?","correct_answer":25}"#.into())],
            store,
        );

        let session = engine.generate_problem(None).await.unwrap();
        assert_eq!(session.correct_answer, 25.0);
    }

    #[tokio::test]
    async fn two_generations_yield_independent_sessions() {
        let text = r#"{"problem_text":"2+2?","final_answer":4}"#;
        let (_, store, engine) = engine(
            vec![Ok(text.into()), Ok(text.into())],
            TestStore::default(),
        );

        let a = engine.generate_problem(None).await.unwrap();
        let b = engine.generate_problem(None).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.sessions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let (provider, _, engine) = engine(vec![], TestStore::default());
        let err = engine.generate_text("   ").await.unwrap_err();
        assert!(matches!(err, LifecycleError::MissingField("prompt")));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn correct_answer_gets_congratulatory_feedback() {
        let (id, store) = seeded_store(4.0);
        let (provider, store, engine) = engine(
            vec![Ok(r#"{"feedback_text":"Brilliant!"}"#.into())],
            store,
        );

        let outcome = engine.submit_answer(&answer(&id, "4")).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.feedback_text, "Brilliant!");
        assert_eq!(outcome.feedback_source, FeedbackSource::Generated);
        assert!(provider.prompts()[0].starts_with("The user correctly answered"));

        let saved = store.submissions.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].is_correct);
        assert_eq!(saved[0].feedback_text, "Brilliant!");
    }

    #[tokio::test]
    async fn rounded_answer_counts_as_correct() {
        let (id, store) = seeded_store(4.0);
        let (_, _, engine) = engine(vec![Ok(r#"{"feedback_text":"Yes!"}"#.into())], store);

        let outcome = engine.submit_answer(&answer(&id, "3.6")).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.user_answer, 3.6);
    }

    #[tokio::test]
    async fn wrong_answer_prompt_names_correct_value() {
        let (id, store) = seeded_store(4.0);
        let (provider, _, engine) = engine(
            vec![Ok(r#"{"feedback_text":"Close! Try again."}"#.into())],
            store,
        );

        let outcome = engine.submit_answer(&answer(&id, "7")).await.unwrap();
        assert!(!outcome.is_correct);
        let prompt = &provider.prompts()[0];
        assert!(prompt.starts_with("The user answered 7"));
        assert!(prompt.contains("The correct answer is 4."));
    }

    #[tokio::test]
    async fn missing_session_is_not_found_and_not_saved() {
        let (provider, store, engine) = engine(vec![], TestStore::default());

        let err = engine
            .submit_answer(&answer(&SessionId::from("nope"), "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SessionNotFound(_)));
        assert!(store.submissions.lock().unwrap().is_empty());
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn store_read_failure_is_lookup_error() {
        let store = TestStore {
            fail_reads: true,
            ..TestStore::default()
        };
        let (_, store, engine) = engine(vec![], store);

        let err = engine
            .submit_answer(&answer(&SessionId::from("any"), "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SessionLookup { .. }));
        assert!(store.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn feedback_service_failure_uses_fallback() {
        let (id, store) = seeded_store(4.0);
        let (provider, store, engine) = engine(vec![Err(anyhow::anyhow!("boom"))], store);

        let outcome = engine.submit_answer(&answer(&id, "4")).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.feedback_source, FeedbackSource::ServiceFallback);
        assert_eq!(
            outcome.feedback_text,
            "That's correct! Excellent work. (AI service error, using default feedback)"
        );
        assert_eq!(provider.prompts().len(), 1);
        assert_eq!(
            store.submissions.lock().unwrap()[0].feedback_text,
            outcome.feedback_text
        );
    }

    #[tokio::test]
    async fn unparsable_feedback_uses_fallback() {
        let (id, store) = seeded_store(4.0);
        let (_, _, engine) = engine(vec![Ok("Great job!".into())], store);

        let outcome = engine.submit_answer(&answer(&id, "9")).await.unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.feedback_source, FeedbackSource::ParseFallback);
        assert_eq!(
            outcome.feedback_text,
            "Incorrect. The correct answer is 4. (AI parsing failed, using default feedback)"
        );
    }

    #[tokio::test]
    async fn submission_write_failure_keeps_feedback() {
        let (id, mut store) = seeded_store(4.0);
        store.fail_writes = true;
        let (_, _, engine) = engine(vec![Ok(r#"{"feedback_text":"Nice"}"#.into())], store);

        let outcome = engine.submit_answer(&answer(&id, "4")).await.unwrap();
        assert_eq!(outcome.feedback_text, "Nice");
    }

    #[tokio::test]
    async fn unusable_correct_answer_grades_false_with_zero_placeholder() {
        let (id, store) = seeded_store(f64::NAN);
        let (provider, _, engine) = engine(
            vec![Ok(r#"{"feedback_text":"Hmm"}"#.into())],
            store,
        );

        let outcome = engine.submit_answer(&answer(&id, "4")).await.unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.correct_answer, None);
        assert!(provider.prompts()[0].contains("The correct answer is 0."));
    }

    #[tokio::test]
    async fn blank_problem_text_uses_stored_text() {
        let (id, store) = seeded_store(4.0);
        let (provider, _, engine) = engine(vec![Ok(r#"{"feedback_text":"ok"}"#.into())], store);

        let submission = AnswerSubmission {
            session_id: id,
            problem_text: String::new(),
            user_answer: "4".into(),
        };
        engine.submit_answer(&submission).await.unwrap();
        assert!(provider.prompts()[0].contains("\"2+2?\""));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (provider, _, engine) = engine(
            vec![
                Err(ProviderError::RateLimited { retry_after_ms: 0 }.into()),
                Ok("hello".into()),
            ],
            TestStore::default(),
        );

        let response = engine.generate_text("hi").await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (provider, _, engine) = engine(
            vec![
                Err(ProviderError::AuthenticationFailed("bad key".into()).into()),
                Ok("never reached".into()),
            ],
            TestStore::default(),
        );

        let err = engine.generate_text("hi").await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (provider, _, engine) = engine(
            vec![
                Err(ProviderError::ApiError {
                    status: 400,
                    message: "INVALID_ARGUMENT".into(),
                }
                .into()),
                Ok("never reached".into()),
            ],
            TestStore::default(),
        );

        let err = engine.generate_text("hi").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 400"));
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test]
    async fn blocked_response_is_not_retried() {
        let (provider, _, engine) = engine(
            vec![
                Err(ProviderError::ApiError {
                    status: 200,
                    message: "no candidates returned (block reason: SAFETY)".into(),
                }
                .into()),
                Ok("never reached".into()),
            ],
            TestStore::default(),
        );

        engine.generate_text("hi").await.unwrap_err();
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let (provider, _, engine) = engine(
            vec![
                Err(ProviderError::ApiError {
                    status: 503,
                    message: "overloaded".into(),
                }
                .into()),
                Ok("hello".into()),
            ],
            TestStore::default(),
        );

        let response = engine.generate_text("hi").await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_retry_delay_is_capped() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::NetworkError("reset".into()).into()),
            Err(ProviderError::NetworkError("reset".into()).into()),
            Ok("hello".into()),
        ]));
        let engine = TutorEngine::new(
            provider.clone(),
            Arc::new(TestStore::default()),
            TutorConfig {
                retry_delay: Duration::MAX,
                ..TutorConfig::default()
            },
        );

        let response = engine.generate_text("hi").await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(provider.prompts().len(), 3);
    }

    #[tokio::test]
    async fn history_lists_attempts() {
        let (id, store) = seeded_store(4.0);
        let (_, _, engine) = engine(
            vec![
                Ok(r#"{"feedback_text":"Not quite"}"#.into()),
                Ok(r#"{"feedback_text":"Yes!"}"#.into()),
            ],
            store,
        );

        engine.submit_answer(&answer(&id, "5")).await.unwrap();
        engine.submit_answer(&answer(&id, "4")).await.unwrap();

        let history = engine.history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_correct);
        assert!(history[1].is_correct);
    }
}
