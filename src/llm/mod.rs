//! OpenRouter chat-completions integration for swipejury.
//!
//! Defines the request/response model shared by every pipeline stage and the
//! [`ModelClient`] trait the panel components depend on. Two call shapes ride
//! on the same endpoint: plain text completions (judge verdicts, consensus
//! synthesis) and image generation (same request plus `modalities`, with
//! image references in the response message).

pub mod openrouter;

pub use openrouter::{resolve_api_key, OpenRouterClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A message in a conversation with a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "system", "user", "assistant").
    pub role: String,
    /// Content: plain text or a list of multimodal parts.
    pub content: MessageContent,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message carrying a single inline image.
    pub fn user_image(data_uri: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![ContentPart::image_url(data_uri)]),
        }
    }
}

/// Message content: a bare string or a list of tagged parts.
///
/// Serializes to the OpenRouter wire shape: `"content": "text"` for the
/// simple case, `"content": [{"type": ...}, ...]` for multimodal messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single part of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from a URL or data URI.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// An image reference: plain URL or base64 data URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Requested response format for contract-bound completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    /// The `json_object` format used by every parsing contract in the panel.
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g., "openai/gpt-4o-mini").
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Response format constraint ("json_object" when a contract applies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Output modalities; set to `["image", "text"]` for image generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

impl ChatRequest {
    /// Create a new chat request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            response_format: None,
            modalities: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Require a JSON object response.
    pub fn with_json_response(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }

    /// Request image output alongside text.
    pub fn with_image_output(mut self) -> Self {
        self.modalities = Some(vec!["image".to_string(), "text".to_string()]);
        self
    }

    /// Whether this request asks the upstream service to synthesize images.
    ///
    /// Image calls get the longer per-request timeout.
    pub fn expects_images(&self) -> bool {
        self.modalities.is_some()
    }
}

/// Response from a chat completion request.
///
/// Deserialization is lenient: image-generation responses omit fields that
/// text completions carry, so everything beyond `choices` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Get the text content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }

    /// Collect every image reference attached to the first choice.
    pub fn image_urls(&self) -> Vec<String> {
        self.choices
            .first()
            .map(|c| {
                c.message
                    .images
                    .iter()
                    .map(|img| img.image_url.url.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total tokens consumed, when the upstream reported usage.
    pub fn total_tokens(&self) -> Option<u32> {
        self.usage.as_ref().map(|u| u.total_tokens)
    }
}

/// A single completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// The assistant message inside a completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// An image attachment on a response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub image_url: ImageUrl,
}

/// Token usage statistics reported by the upstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Trait for clients that can execute chat completions.
///
/// Both call shapes go through the single `chat` operation; the panel
/// components hold an `Arc<dyn ModelClient>` so tests can script responses.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Execute one chat request. Never retried by implementations.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}
