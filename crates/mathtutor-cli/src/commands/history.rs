//! The `mathtutor history` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use mathtutor_core::model::{SessionId, Submission};
use mathtutor_providers::config::load_config_from;

pub async fn execute(config_path: Option<PathBuf>, session_id: String) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = mathtutor_store::open_store(&config.database_url).await?;
    let id = SessionId::from(session_id);

    let session = store
        .fetch_session(&id)
        .await?
        .with_context(|| format!("no session found for id {id}"))?;
    let submissions = store.list_submissions(&id).await?;

    println!("Session: {id}");
    println!("Created: {}", session.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("{}", session.problem_text);
    println!();

    if submissions.is_empty() {
        println!("No submissions yet.");
    } else {
        println!("{}", submissions_table(&submissions));
    }
    Ok(())
}

fn submissions_table(submissions: &[Submission]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Answer", "Correct", "Submitted", "Feedback"]);

    for (i, sub) in submissions.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(sub.user_answer),
            Cell::new(if sub.is_correct { "yes" } else { "no" }),
            Cell::new(sub.submitted_at.format("%H:%M:%S")),
            Cell::new(&sub.feedback_text),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn table_lists_every_attempt() {
        let id = SessionId::from("s1");
        let subs = vec![
            Submission {
                session_id: id.clone(),
                user_answer: 11.0,
                is_correct: false,
                feedback_text: "Close!".into(),
                submitted_at: Utc::now(),
            },
            Submission {
                session_id: id,
                user_answer: 12.0,
                is_correct: true,
                feedback_text: "Well done".into(),
                submitted_at: Utc::now(),
            },
        ];
        let rendered = submissions_table(&subs).to_string();
        assert!(rendered.contains("Close!"));
        assert!(rendered.contains("Well done"));
        assert!(rendered.contains("yes"));
    }
}
