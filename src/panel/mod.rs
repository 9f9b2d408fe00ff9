//! The photo evaluation panel: judges, consensus, and image synthesis.
//!
//! Pipeline stages, leaves first:
//!
//! - [`persona`] - Judge identities and the evaluation goal
//! - [`types`] - Verdicts, tallies, directives, and image payloads
//! - [`evaluator`] - Per-persona photo evaluation
//! - [`aggregator`] - Consensus aggregation into one improvement directive
//! - [`synthesizer`] - Best-effort fan-out image generation
//!
//! The caller evaluates once per persona (the evaluations are independent
//! and safe to run in parallel), aggregates the collected results once, and
//! hands the directive to the synthesizer together with the original photo.
//! Every stage is stateless; nothing survives a pipeline run.

pub mod aggregator;
pub mod evaluator;
pub mod persona;
pub mod synthesizer;
pub mod types;

pub use aggregator::{AggregatorConfig, ConsensusAggregator, DEFAULT_SYNTHESIS_MODEL};
pub use evaluator::{EvaluatorConfig, PersonaEvaluator, DEFAULT_JUDGE_MODEL};
pub use persona::{default_panel, EvaluationGoal, Persona};
pub use synthesizer::{ImageSynthesizer, SynthesizerConfig, DEFAULT_IMAGE_MODEL};
pub use types::{
    ConsensusDirective, EvaluationResult, GeneratedImage, ImageData, SwipeDecision, VerdictTally,
    DEFAULT_IMAGE_MIME,
};
