//! swipejury: Panel-based profile photo evaluation and revision.
//!
//! This library runs a photo past a panel of role-played judges, merges
//! their feedback into one improvement directive, and requests revised
//! photos from an image model.

// Core modules
pub mod cli;
pub mod error;
pub mod llm;
pub mod panel;
pub mod prompts;
pub mod server;
pub mod utils;

// Re-export commonly used error types
pub use error::{LlmError, PanelError, PanelResult};
