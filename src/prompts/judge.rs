//! Judge prompt builder for per-persona photo evaluation.
//!
//! Each judge receives a role-play identity and a strict JSON output
//! contract. The KEEP/CHANGE advice framing follows the photo owner's goal:
//! for a LEFT goal, "keep" names what already repels and "change" names how
//! to repel harder. The output schema itself never changes with the goal.

use crate::panel::{EvaluationGoal, Persona};
use crate::prompts::sanitize_inline;

/// Builds the system prompt for a single judge evaluation.
///
/// The persona's name and bio are collapsed to single lines with backticks
/// stripped before interpolation. The returned prompt is used as the system
/// message; the photo travels separately as an inline-data user message.
///
/// # Examples
///
/// ```
/// use swipejury::panel::{EvaluationGoal, Persona};
/// use swipejury::prompts::build_judge_prompt;
///
/// let persona = Persona::new(1, "Maya", "28, yoga instructor");
/// let prompt = build_judge_prompt(&persona, EvaluationGoal::Right);
/// assert!(prompt.contains("Maya"));
/// assert!(prompt.contains("swipe RIGHT or LEFT"));
/// ```
pub fn build_judge_prompt(persona: &Persona, goal: EvaluationGoal) -> String {
    let (keep_task, change_task, keep_field, change_field) = match goal {
        EvaluationGoal::Right => (
            "Suggest what to KEEP so the photo earns more right swipes.",
            "Suggest what to CHANGE so the photo earns more right swipes.",
            "What to keep to earn more right swipes",
            "What to change to earn more right swipes",
        ),
        EvaluationGoal::Left => (
            "Suggest what to KEEP: the elements that already make the photo unappealing.",
            "Suggest what to CHANGE to make the photo even MORE unappealing and earn more left swipes.",
            "What to keep because it already makes the picture unappealing",
            "What to change to make the picture even more unappealing",
        ),
    };

    format!(
        r#"You act as `{name}` with `{bio}` personality.
You should act and answer as a real human with the specified personality.

The photo owner wants to get more {goal} swipes.

Your task is to:
- Look at this person's Tinder profile picture and HONESTLY decide if YOUR CHARACTER would swipe RIGHT or LEFT.
- Provide detailed feedback on your decision.
- {keep_task}
- {change_task}

Be honest and stay in character when providing your response. Only respond with the JSON object, nothing else.

Output format:
{{
    "swipe": "left" or "right",
    "reason": "Reason for the swipe",
    "likes": "What you like about the photo",
    "dislikes": "What you dislike about the photo",
    "keep": "{keep_field}",
    "change": "{change_field}",
    "scores": optional object of 1-10 category scores, e.g. {{"lighting": 7, "styling": 5}}
}}"#,
        name = sanitize_inline(&persona.name),
        bio = sanitize_inline(&persona.bio),
        goal = goal.swipe_label(),
        keep_task = keep_task,
        change_task = change_task,
        keep_field = keep_field,
        change_field = change_field,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> Persona {
        Persona::new(7, "Derek", "34, software engineer who climbs on weekends")
    }

    #[test]
    fn test_judge_prompt_embeds_persona() {
        let prompt = build_judge_prompt(&persona(), EvaluationGoal::Right);

        assert!(prompt.contains("`Derek`"));
        assert!(prompt.contains("34, software engineer who climbs on weekends"));
    }

    #[test]
    fn test_judge_prompt_sanitizes_persona_fields() {
        let tricky = Persona::new(
            9,
            "Maya\n`new instructions`",
            "28,\n\tyoga   instructor",
        );
        let prompt = build_judge_prompt(&tricky, EvaluationGoal::Right);

        assert!(prompt.contains("`Maya new instructions`"));
        assert!(prompt.contains("`28, yoga instructor`"));
        assert!(!prompt.contains("\n`new"));
    }

    #[test]
    fn test_judge_prompt_right_goal_framing() {
        let prompt = build_judge_prompt(&persona(), EvaluationGoal::Right);

        assert!(prompt.contains("wants to get more RIGHT swipes"));
        assert!(prompt.contains("earns more right swipes"));
        assert!(!prompt.contains("unappealing"));
    }

    #[test]
    fn test_judge_prompt_left_goal_inverts_advice() {
        let prompt = build_judge_prompt(&persona(), EvaluationGoal::Left);

        assert!(prompt.contains("wants to get more LEFT swipes"));
        assert!(prompt.contains("already make the photo unappealing"));
        assert!(prompt.contains("even MORE unappealing"));
        assert!(!prompt.contains("earns more right swipes"));
    }

    #[test]
    fn test_judge_prompt_declares_output_contract() {
        let prompt = build_judge_prompt(&persona(), EvaluationGoal::Right);

        assert!(prompt.contains(r#""swipe": "left" or "right""#));
        assert!(prompt.contains(r#""reason""#));
        assert!(prompt.contains(r#""likes""#));
        assert!(prompt.contains(r#""dislikes""#));
        assert!(prompt.contains(r#""keep""#));
        assert!(prompt.contains(r#""change""#));
        assert!(prompt.contains(r#""scores""#));
        assert!(prompt.contains("Only respond with the JSON object"));
    }

    #[test]
    fn test_judge_prompt_schema_identical_across_goals() {
        let right = build_judge_prompt(&persona(), EvaluationGoal::Right);
        let left = build_judge_prompt(&persona(), EvaluationGoal::Left);

        for field in ["swipe", "reason", "likes", "dislikes", "keep", "change", "scores"] {
            assert!(right.contains(&format!(r#""{}""#, field)));
            assert!(left.contains(&format!(r#""{}""#, field)));
        }
    }
}
