//! mathtutor CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "mathtutor",
    version,
    about = "Generated math word problems with graded feedback"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides bind_addr)
        #[arg(long)]
        bind: Option<String>,

        /// Use the built-in mock generator instead of a real service
        #[arg(long)]
        offline: bool,
    },

    /// Generate a new problem and start a session
    Generate {
        /// Prompt to send instead of the configured problem prompt
        #[arg(long)]
        prompt: Option<String>,

        #[arg(long)]
        offline: bool,
    },

    /// Submit an answer for a session
    Submit {
        #[arg(long)]
        session_id: String,

        /// The answer as typed, e.g. "42" or "12.5"
        #[arg(long, allow_hyphen_values = true)]
        answer: String,

        /// Problem text to quote in feedback (defaults to the stored text)
        #[arg(long)]
        problem_text: Option<String>,

        #[arg(long)]
        offline: bool,
    },

    /// Practice interactively in the terminal
    Play {
        #[arg(long)]
        offline: bool,
    },

    /// Show the submissions recorded for a session
    History {
        #[arg(long)]
        session_id: String,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mathtutor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Serve { bind, offline } => commands::serve::execute(config, bind, offline).await,
        Commands::Generate { prompt, offline } => {
            commands::generate::execute(config, prompt, offline).await
        }
        Commands::Submit {
            session_id,
            answer,
            problem_text,
            offline,
        } => commands::submit::execute(config, session_id, answer, problem_text, offline).await,
        Commands::Play { offline } => commands::play::execute(config, offline).await,
        Commands::History { session_id } => commands::history::execute(config, session_id).await,
        Commands::ListModels { provider } => commands::list_models::execute(provider, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
