//! OpenRouter client for the panel pipeline.
//!
//! All three pipeline stages talk to the same chat-completions endpoint;
//! this client applies the stage-appropriate timeout (text calls are bound
//! to 30 seconds, image generation to 60) and decodes OpenRouter's error
//! envelope on failure. There is deliberately no retry logic: a failed call
//! is surfaced once and the caller decides whether to absorb it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::{ChatRequest, ChatResponse, ModelClient};

/// Default OpenRouter API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Timeout for judge and synthesis text calls, in seconds.
const TEXT_TIMEOUT_SECS: u64 = 30;

/// Timeout for image-generation calls, in seconds. Image synthesis is
/// slower upstream work.
const IMAGE_TIMEOUT_SECS: u64 = 60;

/// Attribution headers OpenRouter uses for app rankings.
const APP_REFERER: &str = "https://swipejury.local";
const APP_TITLE: &str = "swipejury";

/// Client for the OpenRouter chat-completions API.
///
/// Holds the caller-supplied credential for the duration of one pipeline
/// run; the key is never cached or persisted beyond this struct.
pub struct OpenRouterClient {
    /// HTTP client for making API requests.
    client: Client,
    /// API key for OpenRouter authentication.
    api_key: String,
    /// Base URL for the OpenRouter API.
    base_url: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }

    /// Create a client reusing an existing HTTP client.
    ///
    /// The server constructs one of these per request around its shared
    /// connection pool, so per-request credentials don't cost a new pool.
    pub fn with_http_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }

    /// Create a client with a custom base URL.
    ///
    /// Useful for testing or OpenRouter-compatible proxies.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Get the API key masked for logging.
    pub fn api_key_masked(&self) -> String {
        if self.api_key.len() <= 8 {
            "*".repeat(self.api_key.len())
        } else {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Resolve the API key to use for a pipeline run.
///
/// An explicitly supplied key wins; otherwise the `OPENROUTER_API_KEY`
/// environment variable is consulted. Fails before any network attempt
/// when neither is usable.
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, LlmError> {
    resolve_api_key_with(explicit, std::env::var("OPENROUTER_API_KEY").ok())
}

fn resolve_api_key_with(
    explicit: Option<&str>,
    env_key: Option<String>,
) -> Result<String, LlmError> {
    if let Some(key) = explicit {
        if !key.trim().is_empty() {
            return Ok(key.to_string());
        }
    }

    match env_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            tracing::info!("Using API key from OPENROUTER_API_KEY environment variable");
            Ok(key)
        }
        None => Err(LlmError::MissingApiKey),
    }
}

/// Select the per-request timeout for a call shape.
fn request_timeout(request: &ChatRequest) -> Duration {
    if request.expects_images() {
        Duration::from_secs(IMAGE_TIMEOUT_SECS)
    } else {
        Duration::from_secs(TEXT_TIMEOUT_SECS)
    }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let http_response = self
            .client
            .post(&url)
            .timeout(request_timeout(&request))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            // Prefer the structured OpenRouter error envelope when present
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
