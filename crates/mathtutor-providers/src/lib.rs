//! mathtutor-providers — generation service integrations.
//!
//! Implements the `LlmProvider` trait for Google Gemini and OpenAI-compatible
//! chat APIs, plus a mock used for tests and offline runs.

pub mod config;
pub mod gemini;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, MathtutorConfig, ProviderConfig};
pub use mathtutor_core::error::ProviderError;
