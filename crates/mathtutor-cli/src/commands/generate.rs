//! The `mathtutor generate` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config_path: Option<PathBuf>, prompt: Option<String>, offline: bool) -> Result<()> {
    let (_, engine) = super::build_engine(config_path, offline).await?;
    let session = engine.generate_problem(prompt.as_deref()).await?;

    println!("Session: {}", session.id);
    println!();
    println!("{}", session.problem_text);
    println!();
    println!(
        "Answer with: mathtutor submit --session-id {} --answer <ANSWER>",
        session.id
    );
    Ok(())
}
