//! Core data model for the panel pipeline.
//!
//! Everything here is created once per pipeline stage and immutable
//! afterward; nothing is persisted beyond the request. Deserialization is
//! deliberately lenient (every field defaulted) because aggregation accepts
//! possibly-degraded results back from callers.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};

use super::persona::Persona;

/// Default media type assumed for uploads that do not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// A judge's binary verdict on a photo.
///
/// `Unknown` is the default for a missing, null or unrecognized decision
/// field inside an otherwise parseable reply. A wholly unparseable reply
/// produces [`EvaluationResult::degraded`] instead, which carries `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDecision {
    Right,
    Left,
    #[default]
    Unknown,
}

impl SwipeDecision {
    /// Parse a decision label leniently; anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "right" => SwipeDecision::Right,
            "left" => SwipeDecision::Left,
            _ => SwipeDecision::Unknown,
        }
    }

    /// Uppercase label for prompt rendering.
    pub fn label(&self) -> &'static str {
        match self {
            SwipeDecision::Right => "RIGHT",
            SwipeDecision::Left => "LEFT",
            SwipeDecision::Unknown => "UNKNOWN",
        }
    }
}

impl<'de> Deserialize<'de> for SwipeDecision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .map(|label| SwipeDecision::from_label(&label))
            .unwrap_or_default())
    }
}

/// One judge's verdict and critique for a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationResult {
    pub persona_id: i64,
    pub name: String,
    pub swipe: SwipeDecision,
    pub reason: String,
    pub likes: String,
    pub dislikes: String,
    pub keep: String,
    pub change: String,
    /// Optional per-category scores (1-10) some judges include.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<String, i64>,
    /// Deterministic digest of the non-empty text fields, newline-joined.
    pub summary: String,
}

impl EvaluationResult {
    /// Conservative default for a judge whose reply failed to parse.
    ///
    /// Counts as a LEFT swipe in the tally; all text fields empty.
    pub fn degraded(persona: &Persona) -> Self {
        Self {
            persona_id: persona.id,
            name: persona.name.clone(),
            swipe: SwipeDecision::Left,
            ..Default::default()
        }
    }

    /// Render the `Reason:`/`Likes:`/... digest from the text fields.
    pub fn render_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.reason.is_empty() {
            parts.push(format!("Reason: {}", self.reason));
        }
        if !self.likes.is_empty() {
            parts.push(format!("Likes: {}", self.likes));
        }
        if !self.dislikes.is_empty() {
            parts.push(format!("Dislikes: {}", self.dislikes));
        }
        if !self.keep.is_empty() {
            parts.push(format!("Keep: {}", self.keep));
        }
        if !self.change.is_empty() {
            parts.push(format!("Change: {}", self.change));
        }
        parts.join("\n")
    }

    /// Recompute and store the summary digest.
    pub fn with_rendered_summary(mut self) -> Self {
        self.summary = self.render_summary();
        self
    }
}

/// Right/left counts over a set of evaluation results.
///
/// `Unknown` decisions count toward the total but neither direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerdictTally {
    pub right: usize,
    pub left: usize,
    pub total: usize,
}

impl VerdictTally {
    /// Tally the decisions in `results`.
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        let right = results
            .iter()
            .filter(|r| r.swipe == SwipeDecision::Right)
            .count();
        let left = results
            .iter()
            .filter(|r| r.swipe == SwipeDecision::Left)
            .count();
        Self {
            right,
            left,
            total: results.len(),
        }
    }

    /// Percentage of RIGHT decisions; 0.0 for an empty tally.
    pub fn right_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.right as f64 * 100.0 / self.total as f64
        }
    }

    /// Percentage of LEFT decisions; 0.0 for an empty tally.
    pub fn left_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.left as f64 * 100.0 / self.total as f64
        }
    }
}

/// The synthesized improvement directive produced from many verdicts.
///
/// `image_prompt` is never empty when aggregation succeeds: on parse
/// failure the entire raw model response becomes the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsensusDirective {
    pub thinking: String,
    pub image_prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_changes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consensus_keeps: Vec<String>,
}

impl ConsensusDirective {
    /// Mandatory fallback: preserve the raw model output as the prompt so
    /// downstream consumers always receive a usable prompt string.
    pub fn raw_fallback(raw: impl Into<String>) -> Self {
        Self {
            image_prompt: raw.into(),
            ..Default::default()
        }
    }
}

/// An opaque reference to a synthesized photo: plain URL or data URI.
///
/// Serde-transparent, so a sequence serializes as a JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedImage {
    pub url: String,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Split a `data:<mime>;base64,<payload>` reference into its media type
    /// and decoded bytes. Returns `None` for plain URLs or malformed data.
    pub fn decode_data(&self) -> Option<(String, Vec<u8>)> {
        let rest = self.url.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        let bytes = BASE64.decode(payload.trim()).ok()?;
        Some((mime.to_string(), bytes))
    }
}

/// An uploaded photo plus its media type.
#[derive(Debug, Clone)]
pub struct ImageData {
    bytes: Vec<u8>,
    mime: String,
}

impl ImageData {
    /// Create image data with an explicit media type.
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Create image data assuming the default JPEG media type.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DEFAULT_IMAGE_MIME)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as a base64 data URI for inline embedding in a model request.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}
