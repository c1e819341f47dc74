//! Application configuration and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mathtutor_core::engine::TutorConfig;
use mathtutor_core::prompts::{DEFAULT_SYSTEM_PROMPT, PROBLEM_PROMPT};
use mathtutor_core::traits::LlmProvider;

use crate::gemini::GeminiProvider;
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single generation service.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Mock,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Top-level mathtutor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathtutorConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used unless overridden on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model passed to the provider.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// sqlx connection URL for the problem store.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Prompt used to generate a new problem.
    #[serde(default = "default_problem_prompt")]
    pub problem_prompt: String,
    /// System prompt sent with every generation call.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_database_url() -> String {
    "sqlite://mathtutor.db".to_string()
}
fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_problem_prompt() -> String {
    PROBLEM_PROMPT.to_string()
}
fn default_system_prompt() -> Option<String> {
    Some(DEFAULT_SYSTEM_PROMPT.to_string())
}

impl Default for MathtutorConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            database_url: default_database_url(),
            bind_addr: default_bind_addr(),
            problem_prompt: default_problem_prompt(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl MathtutorConfig {
    /// Settings for the lifecycle controller.
    pub fn tutor_config(&self) -> TutorConfig {
        TutorConfig {
            model: self.default_model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
            problem_prompt: self.problem_prompt.clone(),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Build the named provider, or the default one when `name` is `None`.
    ///
    /// `mock` is always available, even when not configured.
    pub fn provider(&self, name: Option<&str>) -> Result<Box<dyn LlmProvider>> {
        let name = name.unwrap_or(self.default_provider.as_str());
        match self.providers.get(name) {
            Some(config) => create_provider(name, config),
            None if name == "mock" => Ok(Box::new(MockProvider::tutor())),
            None => anyhow::bail!(
                "provider '{name}' is not configured; add [providers.{name}] to mathtutor.toml \
                 or set GEMINI_API_KEY"
            ),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Mock => ProviderConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mathtutor.toml` in the current directory
/// 2. `~/.config/mathtutor/config.toml`
///
/// Environment variable overrides: `MATHTUTOR_GEMINI_KEY` (or `GEMINI_API_KEY`),
/// `MATHTUTOR_OPENAI_KEY`.
pub fn load_config() -> Result<MathtutorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MathtutorConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("mathtutor.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MathtutorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MathtutorConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.database_url = resolve_env_vars(&config.database_url);

    Ok(config)
}

fn apply_env_overrides(config: &mut MathtutorConfig) {
    let gemini_key = std::env::var("MATHTUTOR_GEMINI_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .ok()
        .filter(|k| !k.is_empty());
    if let Some(key) = gemini_key {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("MATHTUTOR_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mathtutor"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => {
            if api_key.is_empty() {
                anyhow::bail!("provider '{name}' has an empty api_key");
            }
            Ok(Box::new(GeminiProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        ))),
        ProviderConfig::Mock => Ok(Box::new(MockProvider::tutor())),
    }
}
