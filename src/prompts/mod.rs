//! LLM prompts for the photo evaluation pipeline.
//!
//! This module contains the prompt builders for each stage of the pipeline:
//!
//! - [`judge`] - Role-play prompts for per-persona photo evaluation
//! - [`synthesis`] - Consensus prompts that merge judge verdicts into a directive
//! - [`render`] - Image-generation prompts that apply a directive to a photo
//!
//! Every builder returns plain strings; no builder performs I/O. The JSON
//! contracts the prompts declare are parsed by the corresponding pipeline
//! stages in [`crate::panel`].
//!
//! # Usage
//!
//! ```no_run
//! use swipejury::panel::{EvaluationGoal, Persona, VerdictTally};
//! use swipejury::prompts::{build_judge_prompt, build_render_prompt, build_synthesis_prompt};
//!
//! let persona = Persona::new(1, "Maya", "28, yoga instructor");
//! let judge = build_judge_prompt(&persona, EvaluationGoal::Right);
//!
//! let synthesis = build_synthesis_prompt(&[], VerdictTally::from_results(&[]), EvaluationGoal::Right);
//!
//! let render = build_render_prompt("warmer light, closer crop");
//! ```

pub mod judge;
pub mod render;
pub mod synthesis;

pub use judge::build_judge_prompt;
pub use render::build_render_prompt;
pub use synthesis::{build_synthesis_prompt, render_feedback_block, SynthesisPrompt};

/// Collapses a value to a single space-separated line and strips backticks.
///
/// Used for caller-supplied persona fields that land inside backtick-quoted
/// slots of the judge prompt.
fn sanitize_inline(value: &str) -> String {
    value
        .replace('`', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
