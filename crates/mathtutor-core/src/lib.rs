//! mathtutor-core — Problem lifecycle, response parsing, and grading.
//!
//! This crate defines the data model, the provider and store traits, and the
//! lifecycle controller that the rest of mathtutor builds on.

pub mod engine;
pub mod error;
pub mod grading;
pub mod lifecycle;
pub mod model;
pub mod parser;
pub mod prompts;
pub mod traits;
