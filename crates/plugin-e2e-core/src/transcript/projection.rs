//! Read-only views over a completed transcript.
//!
//! Each projection is computed independently from the transcript alone, so evaluators only
//! pay for the views they use.

use std::collections::BTreeSet;

use super::types::{ContentBlock, Message, Transcript};

/// Tool whose `file_path` input is recorded by [`read_paths`].
pub const READ_TOOL: &str = "Read";
/// Tool whose `skill` input is recorded by [`skill_invocations`].
pub const SKILL_TOOL: &str = "Skill";

/// A tool-use block lifted out of an assistant message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolInvocation<'a> {
    pub name: &'a str,
    pub input: &'a serde_json::Value,
}

impl<'a> ToolInvocation<'a> {
    /// String input field, empty when absent or not a string.
    pub fn input_str(&self, field: &str) -> &'a str {
        self.input
            .get(field)
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

fn assistant_blocks(transcript: &Transcript) -> impl Iterator<Item = &ContentBlock> {
    transcript
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Assistant(a) => Some(a.content.iter()),
            _ => None,
        })
        .flatten()
}

/// Every tool invocation across all assistant messages, in order, optionally filtered by name.
pub fn tool_invocations<'a>(
    transcript: &'a Transcript,
    tool_name: Option<&str>,
) -> Vec<ToolInvocation<'a>> {
    assistant_blocks(transcript)
        .filter_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } => Some(ToolInvocation { name, input }),
            _ => None,
        })
        .filter(|inv| tool_name.map_or(true, |wanted| inv.name == wanted))
        .collect()
}

/// `file_path` of every read, in call order, duplicates kept.
pub fn read_paths(transcript: &Transcript) -> Vec<String> {
    tool_invocations(transcript, Some(READ_TOOL))
        .into_iter()
        .map(|inv| inv.input_str("file_path").to_string())
        .collect()
}

/// Distinct tool names invoked anywhere in the transcript.
pub fn tool_names_used(transcript: &Transcript) -> BTreeSet<String> {
    tool_invocations(transcript, None)
        .into_iter()
        .map(|inv| inv.name.to_string())
        .collect()
}

/// `skill` input of every skill dispatch, in call order.
pub fn skill_invocations(transcript: &Transcript) -> Vec<String> {
    tool_invocations(transcript, Some(SKILL_TOOL))
        .into_iter()
        .map(|inv| inv.input_str("skill").to_string())
        .collect()
}

/// Lower-cased hook stdout joined with newlines, capped at `max_bytes`.
pub fn hook_outputs(transcript: &Transcript, max_bytes: usize) -> String {
    let outputs: Vec<&str> = transcript
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::System(s) if s.is_hook_response() => Some(s.stdout()),
            _ => None,
        })
        .collect();
    fold_capped(&outputs, max_bytes, "hook_outputs")
}

/// Lower-cased assistant text joined with newlines, capped at `max_bytes`.
pub fn response_text(transcript: &Transcript, max_bytes: usize) -> String {
    let texts: Vec<&str> = assistant_blocks(transcript)
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    fold_capped(&texts, max_bytes, "response_text")
}

fn fold_capped(parts: &[&str], max_bytes: usize, projection: &str) -> String {
    let mut folded = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            folded.push('\n');
        }
        folded.push_str(&part.to_lowercase());
        if folded.len() > max_bytes {
            tracing::debug!(
                projection,
                parts = parts.len(),
                kept = i + 1,
                max_bytes,
                "projection truncated"
            );
            let end = truncate_at_char_boundary(&folded, max_bytes).len();
            folded.truncate(end);
            return folded;
        }
    }
    folded
}

/// Longest prefix of `s` no longer than `max_bytes` that ends on a char boundary.
pub fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
