//! The `mathtutor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mathtutor.toml").exists() {
        println!("mathtutor.toml already exists, skipping.");
    } else {
        std::fs::write("mathtutor.toml", SAMPLE_CONFIG)?;
        println!("Created mathtutor.toml");
    }

    println!("\nNext steps:");
    println!("  1. Export GEMINI_API_KEY (or edit mathtutor.toml)");
    println!("  2. Run: mathtutor play");
    println!("  3. Or serve the API: mathtutor serve");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mathtutor configuration

default_provider = "gemini"
default_model = "gemini-2.5-flash"
temperature = 0.7
max_tokens = 1024
max_retries = 2
retry_delay_ms = 1000
database_url = "sqlite://mathtutor.db"
bind_addr = "127.0.0.1:3000"

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.mock]
type = "mock"
"#;
