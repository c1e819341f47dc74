//! API routes.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use mathtutor_core::model::{AnswerSubmission, SessionId};

use crate::error::ApiError;
use crate::AppState;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Problem Routes
// ============================================================================

pub fn problem_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/math-problem", post(generate))
        .route("/api/math-problem/session", post(create_session))
        .route("/api/math-problem/submit", post(submit))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReply {
    pub text: String,
}

/// Relay a prompt to the generation service and return its raw text.
async fn generate(
    State(state): State<AppStateArc>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateReply>, ApiError> {
    let Json(req) = payload?;
    let prompt = req.prompt.unwrap_or_default();
    let response = state.engine.generate_text(&prompt).await?;
    Ok(Json(GenerateReply {
        text: response.text,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// A new problem as shown to the learner. The correct answer stays server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionReply {
    pub session_id: SessionId,
    pub problem_text: String,
}

/// Issue a new session. An empty body means "use the default prompt"; a
/// body that is present must be valid JSON.
async fn create_session(
    State(state): State<AppStateArc>,
    body: Bytes,
) -> Result<Json<SessionReply>, ApiError> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        SessionRequest::default()
    } else {
        let Json(req) = Json::<SessionRequest>::from_bytes(&body)?;
        req
    };
    let session = state.engine.generate_problem(req.prompt.as_deref()).await?;
    info!(session_id = %session.id, "session issued");
    Ok(Json(SessionReply {
        session_id: session.id,
        problem_text: session.problem_text,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub problem_text: String,
    #[serde(default)]
    pub user_answer: AnswerInput,
}

/// The learner's answer as sent by the client: usually a string, sometimes a
/// bare number.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl AnswerInput {
    fn into_text(self) -> String {
        match self {
            AnswerInput::Text(s) => s,
            AnswerInput::Number(n) => n.to_string(),
            AnswerInput::Missing => String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReply {
    pub feedback_text: String,
    pub is_correct: bool,
}

async fn submit(
    State(state): State<AppStateArc>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitReply>, ApiError> {
    let Json(req) = payload?;
    let submission = AnswerSubmission {
        session_id: SessionId::from(req.session_id),
        problem_text: req.problem_text,
        user_answer: req.user_answer.into_text(),
    };

    let outcome = state.engine.submit_answer(&submission).await?;
    Ok(Json(SubmitReply {
        feedback_text: outcome.feedback_text,
        is_correct: outcome.is_correct,
    }))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub uptime_seconds: u64,
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.engine.provider_name().to_string(),
        model: state.engine.config().model.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
