//! Judge personas and the evaluation goal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A synthetic judge identity role-played by the external model.
///
/// Supplied per request by the caller and interpolated into the judge's
/// role-play instruction; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: i64,
    pub name: String,
    pub bio: String,
}

impl Persona {
    /// Create a new persona.
    pub fn new(id: i64, name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bio: bio.into(),
        }
    }
}

/// The direction the photo owner wants verdicts to trend toward.
///
/// `Right` means the owner wants to be liked, `Left` that they want to be
/// disliked. The goal changes prompt framing and advice semantics only; the
/// judge output schema is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationGoal {
    #[default]
    Right,
    Left,
}

impl EvaluationGoal {
    /// Uppercase swipe-direction label used inside prompts.
    pub fn swipe_label(&self) -> &'static str {
        match self {
            EvaluationGoal::Right => "RIGHT",
            EvaluationGoal::Left => "LEFT",
        }
    }
}

impl fmt::Display for EvaluationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationGoal::Right => write!(f, "right"),
            EvaluationGoal::Left => write!(f, "left"),
        }
    }
}

impl FromStr for EvaluationGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "right" => Ok(EvaluationGoal::Right),
            "left" => Ok(EvaluationGoal::Left),
            other => Err(format!(
                "Invalid goal '{}': expected 'right' or 'left'",
                other
            )),
        }
    }
}

/// Built-in judge panel used by the CLI when no personas file is given.
pub fn default_panel() -> Vec<Persona> {
    vec![
        Persona::new(
            1,
            "Maya",
            "28, yoga instructor, swipes left on gym mirror selfies, loves candid outdoor shots",
        ),
        Persona::new(
            2,
            "Derek",
            "34, software engineer, analytical, notices photo quality and composition first",
        ),
        Persona::new(
            3,
            "Priya",
            "25, art student, drawn to personality and humor, allergic to generic poses",
        ),
        Persona::new(
            4,
            "Jordan",
            "31, marketing manager, direct and picky, judges style and grooming hard",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_wire_shape() {
        let persona = Persona::new(7, "Maya", "yoga instructor");
        let json = serde_json::to_value(&persona).expect("serialization should succeed");

        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Maya");
        assert_eq!(json["bio"], "yoga instructor");
    }

    #[test]
    fn test_goal_parse() {
        assert_eq!("right".parse::<EvaluationGoal>(), Ok(EvaluationGoal::Right));
        assert_eq!("LEFT".parse::<EvaluationGoal>(), Ok(EvaluationGoal::Left));
        assert_eq!(" Right ".parse::<EvaluationGoal>(), Ok(EvaluationGoal::Right));
        assert!("sideways".parse::<EvaluationGoal>().is_err());
    }

    #[test]
    fn test_goal_default_is_right() {
        assert_eq!(EvaluationGoal::default(), EvaluationGoal::Right);
    }

    #[test]
    fn test_goal_serde_lowercase() {
        let json = serde_json::to_string(&EvaluationGoal::Left).expect("serializable");
        assert_eq!(json, "\"left\"");
        let goal: EvaluationGoal = serde_json::from_str("\"right\"").expect("deserializable");
        assert_eq!(goal, EvaluationGoal::Right);
    }

    #[test]
    fn test_default_panel_has_distinct_ids() {
        let panel = default_panel();
        assert!(panel.len() >= 3);
        let mut ids: Vec<i64> = panel.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), panel.len());
    }
}
