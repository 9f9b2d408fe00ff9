//! Consensus aggregation of judge verdicts.
//!
//! Randomly permutes the verdicts to strip positional bias, computes the
//! swipe tally, and asks the text model for a structured analysis plus an
//! image prompt. A reply that is not valid JSON
//! or lacks a usable `prompt` field is absorbed: the raw model output
//! becomes the directive's prompt, so downstream consumers always receive a
//! non-empty prompt string.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PanelError, PanelResult};
use crate::llm::{ChatRequest, Message, ModelClient};
use crate::panel::persona::EvaluationGoal;
use crate::panel::types::{ConsensusDirective, EvaluationResult, VerdictTally};
use crate::prompts::build_synthesis_prompt;
use crate::utils::extract_json_from_response;

/// Default model for synthesis calls.
pub const DEFAULT_SYNTHESIS_MODEL: &str = "openai/gpt-4o-mini";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for consensus aggregation.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Model used for synthesis calls. Default: [`DEFAULT_SYNTHESIS_MODEL`].
    pub model: String,
    /// Sampling temperature. Default: None (provider default).
    pub temperature: Option<f64>,
    /// Seed for the verdict shuffle (None = non-deterministic).
    pub seed: Option<u64>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            temperature: None,
            seed: None,
        }
    }
}

impl AggregatorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use for synthesis calls.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Set a shuffle seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ============================================================================
// Synthesis Reply Parsing
// ============================================================================

/// Wire shape of the synthesis reply.
///
/// `prompt` is required; a reply without it fails the parse and triggers the
/// raw-content fallback. The list fields are optional extras.
#[derive(Debug, Clone, Deserialize)]
struct SynthesisReply {
    #[serde(default)]
    thinking: String,
    prompt: String,
    #[serde(default)]
    priority_changes: Vec<String>,
    #[serde(default)]
    consensus_keeps: Vec<String>,
}

// ============================================================================
// Consensus Aggregator
// ============================================================================

/// Merges many judge verdicts into one improvement directive.
pub struct ConsensusAggregator {
    /// Model client for synthesis calls.
    client: Arc<dyn ModelClient>,
    /// Aggregator configuration.
    config: AggregatorConfig,
}

impl ConsensusAggregator {
    /// Create a new consensus aggregator.
    pub fn new(client: Arc<dyn ModelClient>, config: AggregatorConfig) -> Self {
        Self { client, config }
    }

    /// Create a new consensus aggregator with default configuration.
    pub fn with_defaults(client: Arc<dyn ModelClient>) -> Self {
        Self::new(client, AggregatorConfig::default())
    }

    /// Aggregate judge verdicts into one improvement directive.
    ///
    /// `results` may be empty; the synthesis prompt then states that all
    /// tallies are zero instead of dividing by zero. Issues exactly one
    /// outbound call. Transport failures propagate without retry; an
    /// unparseable reply becomes the directive's prompt verbatim.
    pub async fn aggregate(
        &self,
        results: &[EvaluationResult],
        goal: EvaluationGoal,
    ) -> PanelResult<ConsensusDirective> {
        let mut rng = self.create_rng();
        let mut shuffled: Vec<&EvaluationResult> = results.iter().collect();
        shuffled.shuffle(&mut rng);

        let tally = VerdictTally::from_results(results);
        debug!(
            right = tally.right,
            left = tally.left,
            total = tally.total,
            goal = %goal,
            model = %self.config.model,
            "aggregating judge verdicts"
        );

        let prompt = build_synthesis_prompt(&shuffled, tally, goal);
        let messages = vec![Message::system(prompt.system), Message::user(prompt.user)];

        let mut request = ChatRequest::new(&self.config.model, messages).with_json_response();
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.chat(request).await?;
        let content = response
            .first_content()
            .filter(|content| !content.trim().is_empty())
            .ok_or(PanelError::EmptyCompletion)?;

        let extracted = extract_json_from_response(content);
        let directive = match serde_json::from_str::<SynthesisReply>(&extracted) {
            Ok(reply) if !reply.prompt.trim().is_empty() => ConsensusDirective {
                thinking: reply.thinking,
                image_prompt: reply.prompt,
                priority_changes: reply.priority_changes,
                consensus_keeps: reply.consensus_keeps,
            },
            Ok(_) => {
                warn!(
                    raw = content,
                    "synthesis reply has a blank prompt field, using raw content as the prompt"
                );
                ConsensusDirective::raw_fallback(content)
            }
            Err(error) => {
                warn!(
                    %error,
                    raw = content,
                    "synthesis reply is not valid JSON, using raw content as the prompt"
                );
                ConsensusDirective::raw_fallback(content)
            }
        };

        debug!(
            prompt_chars = directive.image_prompt.len(),
            priority_changes = directive.priority_changes.len(),
            consensus_keeps = directive.consensus_keeps.len(),
            "synthesized directive"
        );
        Ok(directive)
    }

    /// Get the aggregator configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    fn create_rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}
