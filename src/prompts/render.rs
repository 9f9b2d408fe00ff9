//! Render prompt builder for revised-photo generation.
//!
//! Wraps the synthesized directive in a fixed instruction carrying the two
//! non-negotiable constraints: the subject's identity is preserved, and the
//! output stays photographically real.

/// Builds the system prompt for one image-generation call.
///
/// `directive` is the aggregated advice text, embedded verbatim. The
/// reference photo travels separately as an inline-data user message.
pub fn build_render_prompt(directive: &str) -> String {
    format!(
        r#"Generate an enhanced version of a Tinder profile picture based on this advice:
```
{directive}
```

Constraints:
- Keep the SAME person: preserve their recognizable facial features, hair, build, and skin tone. Change only the elements the advice calls for.
- The result must look like a real photograph: sharp focus on the subject, natural lighting, and no uncanny-valley artifacts."#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_embeds_directive() {
        let prompt = build_render_prompt("warmer light, closer crop, genuine smile");

        assert!(prompt.contains("```\nwarmer light, closer crop, genuine smile\n```"));
        assert!(prompt.contains("Tinder profile picture"));
    }

    #[test]
    fn test_render_prompt_identity_constraints() {
        let prompt = build_render_prompt("advice");

        assert!(prompt.contains("SAME person"));
        assert!(prompt.contains("recognizable facial features"));
    }

    #[test]
    fn test_render_prompt_realism_constraints() {
        let prompt = build_render_prompt("advice");

        assert!(prompt.contains("sharp focus"));
        assert!(prompt.contains("natural lighting"));
        assert!(prompt.contains("uncanny-valley"));
    }
}
