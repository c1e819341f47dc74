//! Core data model types for mathtutor.
//!
//! A session is one generated problem; a submission is one graded answer to
//! it. Both are written once and never updated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a problem session.
///
/// Generated ids are UUID v4 strings, but any string can be used as a lookup
/// key; an id nobody generated simply never matches a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a fresh, globally unique session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated problem together with its correct answer, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSession {
    pub id: SessionId,
    pub problem_text: String,
    pub correct_answer: f64,
    pub created_at: DateTime<Utc>,
}

impl ProblemSession {
    /// Start a new session for a freshly parsed problem.
    pub fn new(problem: GeneratedProblem) -> Self {
        Self {
            id: SessionId::generate(),
            problem_text: problem.problem_text,
            correct_answer: problem.correct_answer,
            created_at: Utc::now(),
        }
    }
}

/// One graded answer attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// The session this answer belongs to. Always refers to an existing session.
    pub session_id: SessionId,
    pub user_answer: f64,
    pub is_correct: bool,
    pub feedback_text: String,
    pub submitted_at: DateTime<Utc>,
}

/// A problem parsed out of generated text, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProblem {
    pub problem_text: String,
    pub correct_answer: f64,
}

/// Feedback parsed out of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub feedback_text: String,
}

/// Where a submission's feedback text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    /// Written by the generation service.
    Generated,
    /// The service answered but its text held no usable feedback.
    ParseFallback,
    /// The service call itself failed.
    ServiceFallback,
}

impl FeedbackSource {
    pub fn is_fallback(self) -> bool {
        !matches!(self, FeedbackSource::Generated)
    }
}

impl fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSource::Generated => write!(f, "generated"),
            FeedbackSource::ParseFallback => write!(f, "parse-fallback"),
            FeedbackSource::ServiceFallback => write!(f, "service-fallback"),
        }
    }
}

/// An answer submitted for grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub session_id: SessionId,
    /// Problem text as shown to the user. The stored text is used when blank.
    #[serde(default)]
    pub problem_text: String,
    /// Raw user input; parsed leniently during grading.
    #[serde(default)]
    pub user_answer: String,
}

/// The result of grading one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub feedback_text: String,
    pub is_correct: bool,
    /// The answer as interpreted by grading.
    pub user_answer: f64,
    /// The stored correct answer, when it was a usable number.
    pub correct_answer: Option<f64>,
    pub feedback_source: FeedbackSource,
}
