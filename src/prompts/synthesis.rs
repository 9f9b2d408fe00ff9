//! Synthesis prompt builder for consensus aggregation.
//!
//! Turns a set of judge verdicts into one instruction for the text model:
//! aggregate swipe statistics, one fixed textual block per judge, and a
//! strict JSON output contract (`thinking`, `prompt`, `priority_changes`,
//! `consensus_keeps`). The judge blocks arrive pre-shuffled by the
//! aggregator so presentation order carries no signal.

use crate::panel::{EvaluationGoal, EvaluationResult, VerdictTally};

/// Prompts for the consensus synthesis stage.
///
/// Contains both the system prompt (defining the coach's role and output
/// contract) and the user prompt (statistics plus judge feedback blocks).
#[derive(Debug, Clone)]
pub struct SynthesisPrompt {
    /// System prompt establishing the coach's role and the JSON contract.
    pub system: String,
    /// User prompt with tally statistics and per-judge feedback blocks.
    pub user: String,
}

impl SynthesisPrompt {
    /// Creates a new synthesis prompt with the given system and user messages.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Renders one judge's verdict into the fixed textual block consumed by the
/// synthesis model. Text lines are always present; the scores line appears
/// only when the judge supplied scores.
pub fn render_feedback_block(result: &EvaluationResult) -> String {
    let mut block = format!(
        "Character: {}\nDecision: {}\nReason: {}\nLikes: {}\nDislikes: {}\nKeep: {}\nChange: {}\n",
        result.name,
        result.swipe.label(),
        result.reason,
        result.likes,
        result.dislikes,
        result.keep,
        result.change,
    );
    if !result.scores.is_empty() {
        let scores = result
            .scores
            .iter()
            .map(|(category, score)| format!("{}={}", category, score))
            .collect::<Vec<_>>()
            .join(", ");
        block.push_str(&format!("Scores: {}\n", scores));
    }
    block.push_str("---\n");
    block
}

/// Builds the synthesis prompt from pre-shuffled judge results.
///
/// # Arguments
///
/// * `results` - Judge verdicts in the order they should be rendered
/// * `tally` - Right/left counts over the same results
/// * `goal` - The direction the photo owner wants verdicts to trend toward
///
/// # Returns
///
/// A `SynthesisPrompt` ready for use with the text model.
pub fn build_synthesis_prompt(
    results: &[&EvaluationResult],
    tally: VerdictTally,
    goal: EvaluationGoal,
) -> SynthesisPrompt {
    let goal_instruction = match goal {
        EvaluationGoal::Right => {
            "The judges' advice was collected with this goal in mind; apply their suggestions to get more RIGHT swipes."
        }
        EvaluationGoal::Left => {
            "The judges' advice was already framed toward repelling: their keep/change suggestions describe how to make the picture MORE unappealing. Apply them as given to get more LEFT swipes."
        }
    };

    let system = format!(
        r#"You act as an image generation expert and dating coach.
You will receive swipe feedback from several judges about the same Tinder profile picture, together with the overall swipe statistics.

The goal of the owner of the photo is to get more {goal_label} swipes. {goal_instruction}

Based on the feedback, you need to provide your analysis and an image generation prompt:

1. THINKING: Analyze the feedback and think about:
   - CONSENSUS: what a majority of the judges agree on
   - CONFLICTS: where judges disagree; resolve these toward the owner's goal
   - OUTLIERS: single-judge insights that are still worth acting on
   - What elements should definitely be KEPT because they're working well
   - What elements need to be CHANGED
   - What to DOUBLE DOWN on and what to AVOID entirely
   - When deciding on changes, start with "To get more {goal} swipes,"

2. PROMPT: A specific image generation prompt that applies your analysis to the photo.

The prompt should be:
- Detailed and specific about subject pose and expression, camera angle and distance, lighting, background, mood, and photographic style
- Actionable for an AI image generator
- Focused on the most impactful changes mentioned in the feedback

Respond with ONLY a JSON object in this exact format:
{{
    "thinking": "Your detailed analysis",
    "prompt": "The specific image generation prompt",
    "priority_changes": ["most impactful change first", "..."],
    "consensus_keeps": ["element the judges agree must stay", "..."]
}}"#,
        goal_label = goal.swipe_label(),
        goal_instruction = goal_instruction,
        goal = goal,
    );

    let user = if results.is_empty() {
        "No judge feedback was collected for this picture; every swipe tally is zero.\n\
         Produce your best general-purpose directive for the stated goal."
            .to_string()
    } else {
        let blocks = results
            .iter()
            .map(|result| render_feedback_block(result))
            .collect::<String>();
        format!(
            "Here is feedback from different judges about a Tinder profile picture.\n\n\
             Swipe statistics: {right} of {total} judges swiped RIGHT ({right_pct:.1}%), \
             {left} of {total} swiped LEFT ({left_pct:.1}%).\n\n```\n{blocks}```",
            right = tally.right,
            left = tally.left,
            total = tally.total,
            right_pct = tally.right_percent(),
            left_pct = tally.left_percent(),
            blocks = blocks,
        )
    };

    SynthesisPrompt::new(system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::SwipeDecision;

    fn result(name: &str, swipe: SwipeDecision) -> EvaluationResult {
        EvaluationResult {
            persona_id: 1,
            name: name.to_string(),
            swipe,
            reason: "good energy".to_string(),
            likes: "the smile".to_string(),
            dislikes: "dim light".to_string(),
            keep: "the smile".to_string(),
            change: "brighter light".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_feedback_block_fixed_lines() {
        let block = render_feedback_block(&result("Maya", SwipeDecision::Right));

        assert!(block.contains("Character: Maya\n"));
        assert!(block.contains("Decision: RIGHT\n"));
        assert!(block.contains("Reason: good energy\n"));
        assert!(block.contains("Likes: the smile\n"));
        assert!(block.contains("Dislikes: dim light\n"));
        assert!(block.contains("Keep: the smile\n"));
        assert!(block.contains("Change: brighter light\n"));
        assert!(block.ends_with("---\n"));
        assert!(!block.contains("Scores:"));
    }

    #[test]
    fn test_feedback_block_scores_line_when_present() {
        let mut with_scores = result("Priya", SwipeDecision::Left);
        with_scores.scores.insert("lighting".to_string(), 4);
        with_scores.scores.insert("styling".to_string(), 8);

        let block = render_feedback_block(&with_scores);
        assert!(block.contains("Scores: lighting=4, styling=8\n"));
    }

    #[test]
    fn test_feedback_block_degraded_result() {
        let degraded = EvaluationResult {
            name: "Jordan".to_string(),
            swipe: SwipeDecision::Left,
            ..Default::default()
        };
        let block = render_feedback_block(&degraded);

        assert!(block.contains("Character: Jordan\n"));
        assert!(block.contains("Decision: LEFT\n"));
        assert!(block.contains("Reason: \n"));
    }

    #[test]
    fn test_synthesis_prompt_states_statistics() {
        let results = vec![
            result("Maya", SwipeDecision::Right),
            result("Derek", SwipeDecision::Right),
            result("Priya", SwipeDecision::Left),
        ];
        let refs: Vec<&EvaluationResult> = results.iter().collect();
        let tally = VerdictTally::from_results(&results);
        let prompt = build_synthesis_prompt(&refs, tally, EvaluationGoal::Right);

        assert!(prompt
            .user
            .contains("2 of 3 judges swiped RIGHT (66.7%), 1 of 3 swiped LEFT (33.3%)"));
        assert!(prompt.user.contains("Character: Maya"));
        assert!(prompt.user.contains("Character: Derek"));
        assert!(prompt.user.contains("Character: Priya"));
    }

    #[test]
    fn test_synthesis_prompt_empty_results_states_zero() {
        let tally = VerdictTally::from_results(&[]);
        let prompt = build_synthesis_prompt(&[], tally, EvaluationGoal::Right);

        assert!(prompt.user.contains("No judge feedback was collected"));
        assert!(prompt.user.contains("every swipe tally is zero"));
        assert!(!prompt.user.contains("```"));
    }

    #[test]
    fn test_synthesis_prompt_right_goal_branch() {
        let prompt = build_synthesis_prompt(&[], VerdictTally::from_results(&[]), EvaluationGoal::Right);

        assert!(prompt.system.contains("get more RIGHT swipes"));
        assert!(prompt.system.contains("apply their suggestions"));
        assert!(prompt.system.contains(r#""To get more right swipes,""#));
        assert!(!prompt.system.contains("MORE unappealing"));
    }

    #[test]
    fn test_synthesis_prompt_left_goal_branch() {
        let prompt = build_synthesis_prompt(&[], VerdictTally::from_results(&[]), EvaluationGoal::Left);

        assert!(prompt.system.contains("get more LEFT swipes"));
        assert!(prompt.system.contains("MORE unappealing"));
        assert!(prompt.system.contains(r#""To get more left swipes,""#));
        assert!(!prompt.system.contains("apply their suggestions to get more RIGHT"));
    }

    #[test]
    fn test_synthesis_prompt_declares_output_contract() {
        let prompt = build_synthesis_prompt(&[], VerdictTally::from_results(&[]), EvaluationGoal::Right);

        assert!(prompt.system.contains(r#""thinking""#));
        assert!(prompt.system.contains(r#""prompt""#));
        assert!(prompt.system.contains(r#""priority_changes""#));
        assert!(prompt.system.contains(r#""consensus_keeps""#));
        assert!(prompt.system.contains("ONLY a JSON object"));
    }

    #[test]
    fn test_synthesis_prompt_covers_photographic_dimensions() {
        let prompt = build_synthesis_prompt(&[], VerdictTally::from_results(&[]), EvaluationGoal::Right);

        for dimension in [
            "pose and expression",
            "camera angle and distance",
            "lighting",
            "background",
            "mood",
            "photographic style",
        ] {
            assert!(
                prompt.system.contains(dimension),
                "missing dimension: {}",
                dimension
            );
        }
    }
}
