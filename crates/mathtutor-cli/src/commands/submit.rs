//! The `mathtutor submit` command.

use std::path::PathBuf;

use anyhow::Result;

use mathtutor_core::model::{AnswerSubmission, SessionId};

pub async fn execute(
    config_path: Option<PathBuf>,
    session_id: String,
    answer: String,
    problem_text: Option<String>,
    offline: bool,
) -> Result<()> {
    let (_, engine) = super::build_engine(config_path, offline).await?;

    let outcome = engine
        .submit_answer(&AnswerSubmission {
            session_id: SessionId::from(session_id),
            problem_text: problem_text.unwrap_or_default(),
            user_answer: answer,
        })
        .await?;

    if outcome.is_correct {
        println!("Correct!");
    } else {
        println!("Incorrect.");
    }
    println!("{}", outcome.feedback_text);
    Ok(())
}
