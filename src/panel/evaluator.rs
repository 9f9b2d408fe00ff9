//! Per-persona photo evaluation.
//!
//! Runs one judge persona against one photo: builds the role-play prompt,
//! issues a single multimodal call, and parses the JSON verdict.
//! A judge whose reply cannot be parsed degrades to a conservative LEFT
//! verdict instead of failing the pipeline; only transport errors and an
//! empty completion envelope propagate to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PanelError, PanelResult};
use crate::llm::{ChatRequest, Message, ModelClient};
use crate::panel::persona::{EvaluationGoal, Persona};
use crate::panel::types::{EvaluationResult, ImageData, SwipeDecision};
use crate::prompts::build_judge_prompt;
use crate::utils::extract_json_from_response;

/// Default model for judge calls.
pub const DEFAULT_JUDGE_MODEL: &str = "openai/gpt-4o-mini";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for persona evaluation.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Model used for judge calls. Default: [`DEFAULT_JUDGE_MODEL`].
    pub model: String,
    /// Sampling temperature. Default: None (provider default).
    pub temperature: Option<f64>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_JUDGE_MODEL.to_string(),
            temperature: None,
        }
    }
}

impl EvaluatorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use for judge calls.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }
}

// ============================================================================
// Judge Reply Parsing
// ============================================================================

/// Wire shape of a judge's JSON reply.
///
/// Every field is defaulted so a parseable object with missing fields still
/// yields a usable result; the decision falls back to `Unknown` rather than
/// failing the parse.
#[derive(Debug, Clone, Deserialize)]
struct JudgeReply {
    #[serde(default)]
    swipe: SwipeDecision,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    likes: String,
    #[serde(default)]
    dislikes: String,
    #[serde(default)]
    keep: String,
    #[serde(default)]
    change: String,
    #[serde(default)]
    scores: BTreeMap<String, i64>,
}

// ============================================================================
// Persona Evaluator
// ============================================================================

/// Evaluates one photo through the eyes of one judge persona.
pub struct PersonaEvaluator {
    /// Model client for judge calls.
    client: Arc<dyn ModelClient>,
    /// Evaluator configuration.
    config: EvaluatorConfig,
}

impl PersonaEvaluator {
    /// Create a new persona evaluator.
    pub fn new(client: Arc<dyn ModelClient>, config: EvaluatorConfig) -> Self {
        Self { client, config }
    }

    /// Create a new persona evaluator with default configuration.
    pub fn with_defaults(client: Arc<dyn ModelClient>) -> Self {
        Self::new(client, EvaluatorConfig::default())
    }

    /// Evaluate a photo as `persona` and return its verdict.
    ///
    /// Issues exactly one outbound call with the photo embedded as inline
    /// data. Transport failures propagate without retry. A reply that is not
    /// valid JSON is absorbed into a degraded LEFT verdict; a reply that is
    /// valid JSON but missing fields keeps whatever fields it has, with the
    /// decision defaulting to `Unknown`.
    pub async fn evaluate(
        &self,
        image: &ImageData,
        persona: &Persona,
        goal: EvaluationGoal,
    ) -> PanelResult<EvaluationResult> {
        let messages = vec![
            Message::system(build_judge_prompt(persona, goal)),
            Message::user_image(image.to_data_uri()),
        ];

        let mut request = ChatRequest::new(&self.config.model, messages).with_json_response();
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(
            persona_id = persona.id,
            persona_name = %persona.name,
            model = %self.config.model,
            goal = %goal,
            image_bytes = image.len(),
            "evaluating photo"
        );

        let response = self.client.chat(request).await?;
        let content = response
            .first_content()
            .ok_or(PanelError::EmptyCompletion)?;

        let extracted = extract_json_from_response(content);
        let result = match serde_json::from_str::<JudgeReply>(&extracted) {
            Ok(reply) => EvaluationResult {
                persona_id: persona.id,
                name: persona.name.clone(),
                swipe: reply.swipe,
                reason: reply.reason,
                likes: reply.likes,
                dislikes: reply.dislikes,
                keep: reply.keep,
                change: reply.change,
                scores: reply.scores,
                summary: String::new(),
            }
            .with_rendered_summary(),
            Err(error) => {
                warn!(
                    persona_id = persona.id,
                    persona_name = %persona.name,
                    %error,
                    raw = content,
                    "judge reply is not valid JSON, degrading to a LEFT verdict"
                );
                EvaluationResult::degraded(persona)
            }
        };

        debug!(
            persona_id = persona.id,
            swipe = result.swipe.label(),
            "judge verdict"
        );
        Ok(result)
    }

    /// Get the evaluator configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }
}
