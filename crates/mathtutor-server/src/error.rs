//! Mapping of lifecycle failures onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use mathtutor_core::error::LifecycleError;

pub const GENERATION_FAILED: &str = "Failed to generate content from the generation service.";
pub const UNPARSABLE_PROBLEM: &str = "The generation service did not return a readable problem.";
pub const SESSION_NOT_FOUND: &str =
    "Could not find the correct answer for this problem. Please contact support.";
pub const SESSION_LOOKUP_FAILED: &str =
    "An error occurred while retrieving the problem details. Please try again.";

/// An error returned by a handler.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be read as JSON of the expected shape.
    BadRequest(String),
    Lifecycle(LifecycleError),
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        ApiError::Lifecycle(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Status code and JSON body for this error.
    ///
    /// Lookup failures on the submit path keep the answer-shaped body
    /// (`feedback_text`, `is_correct`) so clients can render them directly.
    fn parts(&self) -> (StatusCode, serde_json::Value) {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::Lifecycle(e) => match e {
                LifecycleError::MissingField("prompt") => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Prompt is required" }),
                ),
                LifecycleError::MissingField(field) => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": format!("{field} is required") }),
                ),
                LifecycleError::Generation(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": GENERATION_FAILED }),
                ),
                LifecycleError::UnparsableProblem(_) => (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": UNPARSABLE_PROBLEM }),
                ),
                LifecycleError::SessionNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    json!({ "feedback_text": SESSION_NOT_FOUND, "is_correct": false }),
                ),
                LifecycleError::SessionLookup { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "feedback_text": SESSION_LOOKUP_FAILED, "is_correct": false }),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            match &self {
                ApiError::Lifecycle(e) => tracing::error!(%status, "request failed: {e}"),
                ApiError::BadRequest(m) => tracing::error!(%status, "request failed: {m}"),
            }
        }
        (status, Json(body)).into_response()
    }
}
