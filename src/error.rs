//! Error types for swipejury operations.
//!
//! Defines error types for the two subsystems that can fail:
//! - OpenRouter API interactions (transport, auth, rate limits)
//! - Panel pipeline stages (evaluation, aggregation, generation)
//!
//! Malformed model output is deliberately NOT an error here: judge and
//! synthesis replies that fail to parse are absorbed into degraded defaults
//! by the panel components, so the pipeline always returns a structurally
//! valid result.

use thiserror::Error;

/// Errors that can occur during OpenRouter API operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: no key supplied and OPENROUTER_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur during panel pipeline stages.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

/// Result type alias for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;
