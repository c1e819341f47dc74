//! The `mathtutor serve` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config_path: Option<PathBuf>, bind: Option<String>, offline: bool) -> Result<()> {
    let (config, engine) = super::build_engine(config_path, offline).await?;
    let addr = bind.unwrap_or(config.bind_addr);
    mathtutor_server::serve(&addr, engine).await
}
