//! Best-effort fan-out image generation.
//!
//! Issues `count` independent generation calls for the same directive and
//! reference photo and collects whatever images succeed. The calls run
//! concurrently; a failing call is logged and skipped, never aborting the
//! rest. This stage has no error return at all. A caller that needs "zero
//! images" surfaced as a failure checks the returned length itself.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ChatRequest, Message, ModelClient};
use crate::panel::types::{GeneratedImage, ImageData};
use crate::prompts::build_render_prompt;

/// Default model for image-generation calls.
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-3-pro-image-preview";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for image synthesis.
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Model used for generation calls. Default: [`DEFAULT_IMAGE_MODEL`].
    pub model: String,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

impl SynthesizerConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use for generation calls.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// ============================================================================
// Image Synthesizer
// ============================================================================

/// Requests revised photos from the image model, tolerating per-call failure.
pub struct ImageSynthesizer {
    /// Model client for generation calls.
    client: Arc<dyn ModelClient>,
    /// Synthesizer configuration.
    config: SynthesizerConfig,
}

impl ImageSynthesizer {
    /// Create a new image synthesizer.
    pub fn new(client: Arc<dyn ModelClient>, config: SynthesizerConfig) -> Self {
        Self { client, config }
    }

    /// Create a new image synthesizer with default configuration.
    pub fn with_defaults(client: Arc<dyn ModelClient>) -> Self {
        Self::new(client, SynthesizerConfig::default())
    }

    /// Generate revised photos for a directive against a reference photo.
    ///
    /// Issues exactly `count` independent calls, each a fresh stateless
    /// request with the same prompt and reference image; the upstream
    /// service returns at most one variant per call. Every image reference
    /// a successful call carries is collected. Failed calls and imageless
    /// replies are logged and skipped.
    pub async fn generate(
        &self,
        directive: &str,
        original: &ImageData,
        count: usize,
    ) -> Vec<GeneratedImage> {
        if count == 0 {
            return Vec::new();
        }

        let system_prompt = build_render_prompt(directive);
        let data_uri = original.to_data_uri();

        debug!(
            model = %self.config.model,
            count,
            directive_chars = directive.len(),
            "generating revised photos"
        );

        let calls = (0..count).map(|attempt| {
            let request = ChatRequest::new(
                &self.config.model,
                vec![
                    Message::system(system_prompt.clone()),
                    Message::user_image(data_uri.clone()),
                ],
            )
            .with_image_output();
            let client = Arc::clone(&self.client);
            async move { (attempt, client.chat(request).await) }
        });

        let outcomes = futures::future::join_all(calls).await;

        let mut images = Vec::new();
        for (attempt, outcome) in outcomes {
            match outcome {
                Ok(response) => {
                    let urls = response.image_urls();
                    if urls.is_empty() {
                        warn!(attempt, "generation call returned no images, skipping");
                    } else {
                        debug!(attempt, images = urls.len(), "generation call succeeded");
                        images.extend(urls.into_iter().map(GeneratedImage::new));
                    }
                }
                Err(error) => {
                    warn!(attempt, %error, "generation call failed, skipping");
                }
            }
        }

        debug!(
            requested = count,
            produced = images.len(),
            "image generation finished"
        );
        images
    }

    /// Get the synthesizer configuration.
    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{ChatResponse, Choice, ImageRef, ImageUrl, MessageContent, ResponseMessage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// What one mock call should produce.
    #[derive(Clone)]
    enum CannedOutcome {
        Images(Vec<&'static str>),
        Text(&'static str),
        Fail(&'static str),
    }

    /// Mock model client that replays canned per-call outcomes.
    struct MockModelClient {
        outcomes: Mutex<Vec<CannedOutcome>>,
        requests: Mutex<Vec<ChatRequest>>,
        call_count: AtomicUsize,
    }

    impl MockModelClient {
        fn new(outcomes: Vec<CannedOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        fn recorded_requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().expect("lock poisoned").clone()
        }
    }

    #[async_trait]
    impl ModelClient for MockModelClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
            self.requests.lock().expect("lock poisoned").push(request);
            let index = self.call_count.fetch_add(1, Ordering::SeqCst);
            let outcomes = self.outcomes.lock().expect("lock poisoned");
            let outcome = outcomes
                .get(index)
                .cloned()
                .unwrap_or(CannedOutcome::Text("out of canned outcomes"));

            match outcome {
                CannedOutcome::Images(urls) => Ok(ChatResponse {
                    id: Some(format!("test-{}", index)),
                    model: Some("test-model".to_string()),
                    choices: vec![Choice {
                        message: ResponseMessage {
                            content: None,
                            images: urls
                                .into_iter()
                                .map(|url| ImageRef {
                                    image_url: ImageUrl {
                                        url: url.to_string(),
                                    },
                                })
                                .collect(),
                        },
                    }],
                    usage: None,
                }),
                CannedOutcome::Text(text) => Ok(ChatResponse {
                    id: Some(format!("test-{}", index)),
                    model: Some("test-model".to_string()),
                    choices: vec![Choice {
                        message: ResponseMessage {
                            content: Some(text.to_string()),
                            images: vec![],
                        },
                    }],
                    usage: None,
                }),
                CannedOutcome::Fail(message) => {
                    Err(LlmError::RequestFailed(message.to_string()))
                }
            }
        }
    }

    fn photo() -> ImageData {
        ImageData::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[test]
    fn test_synthesizer_config_defaults() {
        let config = SynthesizerConfig::default();
        assert_eq!(config.model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_synthesizer_config_builder() {
        let config = SynthesizerConfig::new().with_model("test/image");
        assert_eq!(config.model, "test/image");
    }

    #[tokio::test]
    async fn test_generate_zero_count_issues_no_calls() {
        let mock = Arc::new(MockModelClient::new(vec![]));
        let synthesizer =
            ImageSynthesizer::with_defaults(Arc::clone(&mock) as Arc<dyn ModelClient>);

        let images = synthesizer.generate("advice", &photo(), 0).await;

        assert!(images.is_empty());
        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_generate_collects_all_successes() {
        let mock = Arc::new(MockModelClient::new(vec![
            CannedOutcome::Images(vec!["data:image/png;base64,AAAA"]),
            CannedOutcome::Images(vec!["data:image/png;base64,BBBB"]),
            CannedOutcome::Images(vec!["data:image/png;base64,CCCC"]),
        ]));
        let synthesizer =
            ImageSynthesizer::with_defaults(Arc::clone(&mock) as Arc<dyn ModelClient>);

        let images = synthesizer.generate("advice", &photo(), 3).await;

        assert_eq!(images.len(), 3);
        assert_eq!(mock.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_generate_absorbs_partial_failures() {
        let mock = Arc::new(MockModelClient::new(vec![
            CannedOutcome::Fail("connection reset"),
            CannedOutcome::Images(vec!["data:image/png;base64,AAAA"]),
            CannedOutcome::Fail("upstream timeout"),
            CannedOutcome::Images(vec!["data:image/png;base64,BBBB"]),
        ]));
        let synthesizer = ImageSynthesizer::with_defaults(mock);

        let images = synthesizer.generate("advice", &photo(), 4).await;

        assert_eq!(images.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_all_failures_returns_empty() {
        let mock = Arc::new(MockModelClient::new(vec![
            CannedOutcome::Fail("boom"),
            CannedOutcome::Fail("boom"),
            CannedOutcome::Fail("boom"),
        ]));
        let synthesizer = ImageSynthesizer::with_defaults(mock);

        let images = synthesizer.generate("advice", &photo(), 3).await;

        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_generate_skips_imageless_reply() {
        let mock = Arc::new(MockModelClient::new(vec![
            CannedOutcome::Text("I cannot generate that image."),
            CannedOutcome::Images(vec!["data:image/png;base64,AAAA"]),
        ]));
        let synthesizer = ImageSynthesizer::with_defaults(mock);

        let images = synthesizer.generate("advice", &photo(), 2).await;

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_generate_extracts_every_image_in_a_reply() {
        let mock = Arc::new(MockModelClient::new(vec![CannedOutcome::Images(vec![
            "data:image/png;base64,AAAA",
            "data:image/png;base64,BBBB",
        ])]));
        let synthesizer = ImageSynthesizer::with_defaults(mock);

        let images = synthesizer.generate("advice", &photo(), 1).await;

        assert_eq!(images.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_request_shape() {
        let mock = Arc::new(MockModelClient::new(vec![CannedOutcome::Images(vec![
            "data:image/png;base64,AAAA",
        ])]));
        let synthesizer = ImageSynthesizer::new(
            Arc::clone(&mock) as Arc<dyn ModelClient>,
            SynthesizerConfig::new().with_model("test/image"),
        );

        synthesizer
            .generate("warmer light, tidier background", &photo(), 1)
            .await;

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);

        let request = &requests[0];
        assert_eq!(request.model, "test/image");
        assert!(request.expects_images());
        assert!(request.response_format.is_none());

        match &request.messages[0].content {
            MessageContent::Text(text) => {
                assert!(text.contains("warmer light, tidier background"));
                assert!(text.contains("SAME person"));
            }
            other => panic!("expected text system message, got {:?}", other),
        }
        match &request.messages[1].content {
            MessageContent::Parts(parts) => {
                let json = serde_json::to_string(parts).expect("serializable");
                assert!(json.contains("data:image/jpeg;base64,"));
            }
            other => panic!("expected image user message, got {:?}", other),
        }
    }
}
