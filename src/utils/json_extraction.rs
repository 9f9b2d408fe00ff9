//! JSON extraction from model replies.
//!
//! Judge and synthesis replies are requested with `response_format =
//! json_object`, but models still occasionally wrap the object in markdown
//! fences or surround it with prose. This module pulls the reply object out
//! before strict parsing.
//!
//! Strategies, in order:
//! 1. ```json fenced block
//! 2. Generic fenced block
//! 3. Direct JSON (content starts with '{')
//! 4. Largest valid object anywhere (reasoning models emit thinking text,
//!    sometimes containing small example objects, before the real reply)
//!
//! Nothing here is an error: when no object is found the trimmed original
//! content is returned, and the panel components degrade per their parse
//! contracts when strict parsing subsequently fails.

use regex::Regex;

/// Extracts a JSON object from a model reply that might be wrapped in
/// markdown or prose.
///
/// Returns the extracted object, or the trimmed original content when no
/// valid object is found (so the caller's strict parse fails with a
/// meaningful error).
pub fn extract_json_from_response(content: &str) -> String {
    let trimmed = content.trim();

    if let Some(json) = extract_from_json_code_block(trimmed) {
        if is_valid_json(&json) {
            return json;
        }
    }

    if let Some(json) = extract_from_generic_code_block(trimmed) {
        if is_valid_json(&json) {
            return json;
        }
    }

    if trimmed.starts_with('{') {
        if let Some(end) = find_matching_brace(trimmed) {
            let candidate = &trimmed[..=end];
            if is_valid_json(candidate) {
                return candidate.to_string();
            }
        }
    }

    if let Some(json) = extract_largest_valid_object(trimmed) {
        return json;
    }

    trimmed.to_string()
}

fn is_valid_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Finds the index of the closing '}' matching the opening brace at the
/// start of `s`, honoring string literals and escape sequences.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract a JSON object from a ```json ... ``` code block.
fn extract_from_json_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```json\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let json_content = caps.get(1)?.as_str().trim();
    if json_content.starts_with('{') {
        if let Some(end) = find_matching_brace(json_content) {
            return Some(json_content[..=end].to_string());
        }
        return Some(json_content.to_string());
    }
    None
}

/// Extract a JSON object from a generic ``` ... ``` code block.
fn extract_from_generic_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let block_content = caps.get(1)?.as_str().trim();
    let start = block_content.find('{')?;
    let end = find_matching_brace(&block_content[start..])?;
    Some(block_content[start..=start + end].to_string())
}

/// Extract the largest valid JSON object in `content`, preferring later
/// occurrences on equal size. The real reply is typically the largest
/// object and sits at the end, after any thinking text.
fn extract_largest_valid_object(content: &str) -> Option<String> {
    let brace_positions: Vec<usize> = content
        .char_indices()
        .filter_map(|(i, c)| if c == '{' { Some(i) } else { None })
        .collect();

    let mut valid_objects: Vec<(usize, String)> = Vec::new();
    for &start in &brace_positions {
        let substr = &content[start..];
        if let Some(end) = find_matching_brace(substr) {
            let candidate = &substr[..=end];
            if is_valid_json(candidate) {
                valid_objects.push((start, candidate.to_string()));
            }
        }
    }

    valid_objects
        .into_iter()
        .max_by(|(pos_a, json_a), (pos_b, json_b)| {
            match json_a.len().cmp(&json_b.len()) {
                std::cmp::Ordering::Equal => pos_a.cmp(pos_b),
                other => other,
            }
        })
        .map(|(_, json)| json)
}
