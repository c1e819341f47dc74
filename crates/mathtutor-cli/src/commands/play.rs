//! The `mathtutor play` command: an interactive practice loop.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use mathtutor_core::engine::TutorEngine;
use mathtutor_core::lifecycle::{LifecycleEvent, LifecycleState};
use mathtutor_core::model::{AnswerSubmission, ProblemSession};

pub async fn execute(config_path: Option<PathBuf>, offline: bool) -> Result<()> {
    let (_, engine) = super::build_engine(config_path, offline).await?;
    let stdin = BufReader::new(tokio::io::stdin());
    run(&engine, stdin, std::io::stdout()).await
}

enum Next {
    NewProblem,
    Quit,
}

/// Drive one practice session over arbitrary input and output.
pub async fn run<R, W>(engine: &TutorEngine, input: R, mut out: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut state = LifecycleState::Idle;
    let mut solved = 0u32;

    writeln!(out, "Type an answer, 'n' for a new problem, or 'q' to quit.")?;

    loop {
        state = state.transition(LifecycleEvent::GenerateRequested)?;
        let session = match engine.generate_problem(None).await {
            Ok(session) => {
                state = state.transition(LifecycleEvent::ProblemReady)?;
                session
            }
            Err(e) => {
                state = state.transition(LifecycleEvent::GenerationFailed)?;
                writeln!(out, "Could not generate a problem: {e}")?;
                write!(out, "Press Enter to try again or 'q' to quit: ")?;
                out.flush()?;
                match lines.next_line().await? {
                    Some(line) if line.trim() != "q" => continue,
                    _ => break,
                }
            }
        };

        writeln!(out, "\n{}\n", session.problem_text)?;

        match answer_loop(engine, &session, &mut state, &mut lines, &mut out, &mut solved).await? {
            Next::NewProblem => continue,
            Next::Quit => break,
        }
    }

    writeln!(out, "Solved {solved} problem(s). Bye!")?;
    Ok(())
}

async fn answer_loop<R, W>(
    engine: &TutorEngine,
    session: &ProblemSession,
    state: &mut LifecycleState,
    lines: &mut tokio::io::Lines<R>,
    out: &mut W,
    solved: &mut u32,
) -> Result<Next>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(out, "Your answer: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(Next::Quit);
        };
        let answer = line.trim();
        match answer {
            "" => continue,
            "q" => return Ok(Next::Quit),
            "n" => return Ok(Next::NewProblem),
            _ => {}
        }

        *state = state.transition(LifecycleEvent::AnswerSubmitted)?;
        let submission = AnswerSubmission {
            session_id: session.id.clone(),
            problem_text: session.problem_text.clone(),
            user_answer: answer.to_string(),
        };

        let outcome = match engine.submit_answer(&submission).await {
            Ok(outcome) => outcome,
            Err(e) => {
                *state = state.transition(LifecycleEvent::LookupFailed)?;
                writeln!(out, "{e}")?;
                return Ok(Next::NewProblem);
            }
        };

        *state = state.transition(LifecycleEvent::AnswerGraded)?;
        let event = if outcome.feedback_source.is_fallback() {
            LifecycleEvent::FeedbackFallback
        } else {
            LifecycleEvent::FeedbackReceived
        };
        *state = state.transition(event)?;

        let attempts = engine.history(&session.id).await.map(|h| h.len()).unwrap_or(0);
        if outcome.is_correct {
            *solved += 1;
            writeln!(out, "Correct! (attempt {attempts})")?;
        } else {
            writeln!(out, "Not quite. (attempt {attempts})")?;
        }
        writeln!(out, "{}", outcome.feedback_text)?;

        if outcome.is_correct {
            return Ok(Next::NewProblem);
        }
    }
}
