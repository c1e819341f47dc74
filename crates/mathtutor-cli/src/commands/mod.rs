//! Subcommand implementations.

pub mod generate;
pub mod history;
pub mod init;
pub mod list_models;
pub mod play;
pub mod serve;
pub mod submit;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use mathtutor_core::engine::TutorEngine;
use mathtutor_core::traits::LlmProvider;
use mathtutor_providers::config::{load_config_from, MathtutorConfig};
use mathtutor_providers::mock::MockProvider;

/// Load config and wire up the lifecycle controller.
///
/// `offline` replaces the configured provider with the canned mock tutor.
pub async fn build_engine(
    config_path: Option<PathBuf>,
    offline: bool,
) -> Result<(MathtutorConfig, Arc<TutorEngine>)> {
    let config = load_config_from(config_path.as_deref())?;

    let provider: Arc<dyn LlmProvider> = if offline {
        Arc::new(MockProvider::tutor())
    } else {
        Arc::from(config.provider(None)?)
    };
    let store = mathtutor_store::open_store(&config.database_url).await?;
    info!(
        provider = provider.name(),
        model = %config.default_model,
        "engine ready"
    );

    let engine = TutorEngine::new(provider, store, config.tutor_config());
    Ok((config, Arc::new(engine)))
}
