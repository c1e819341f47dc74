//! The per-session lifecycle state machine.
//!
//! `TutorEngine` performs the work; this type tracks where an interactive
//! session is, so a front end can refuse out-of-order actions (e.g. grading
//! before a problem is ready).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Generating,
    /// A problem is displayed and its session persisted.
    Ready,
    Grading,
    FeedbackRequested,
    /// The submission is persisted and feedback shown.
    Graded,
    /// The session could not be looked up; it cannot be graded.
    Error,
}

/// Something that happened to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    GenerateRequested,
    ProblemReady,
    GenerationFailed,
    AnswerSubmitted,
    LookupFailed,
    AnswerGraded,
    FeedbackReceived,
    FeedbackFallback,
}

/// An event that is not allowed in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot handle {event:?} while {state}")]
pub struct InvalidTransition {
    pub state: LifecycleState,
    pub event: LifecycleEvent,
}

impl LifecycleState {
    /// Apply an event, returning the next state.
    ///
    /// A new problem may be requested from any resting state; another answer
    /// may be submitted after grading.
    pub fn transition(self, event: LifecycleEvent) -> Result<LifecycleState, InvalidTransition> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let next = match (self, event) {
            (S::Idle | S::Ready | S::Graded | S::Error, E::GenerateRequested) => S::Generating,
            (S::Generating, E::ProblemReady) => S::Ready,
            (S::Generating, E::GenerationFailed) => S::Idle,
            (S::Ready | S::Graded, E::AnswerSubmitted) => S::Grading,
            (S::Grading, E::LookupFailed) => S::Error,
            (S::Grading, E::AnswerGraded) => S::FeedbackRequested,
            (S::FeedbackRequested, E::FeedbackReceived | E::FeedbackFallback) => S::Graded,
            (state, event) => return Err(InvalidTransition { state, event }),
        };
        Ok(next)
    }

    /// Whether the session is waiting on an external call.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            LifecycleState::Generating | LifecycleState::Grading | LifecycleState::FeedbackRequested
        )
    }

    /// Whether an answer can be submitted now.
    pub fn accepts_answer(self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Graded)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Generating => "generating",
            LifecycleState::Ready => "ready",
            LifecycleState::Grading => "grading",
            LifecycleState::FeedbackRequested => "feedback-requested",
            LifecycleState::Graded => "graded",
            LifecycleState::Error => "error",
        };
        f.write_str(name)
    }
}
