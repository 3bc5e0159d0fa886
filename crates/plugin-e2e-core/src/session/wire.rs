//! Decoding of the runtime's `stream-json` output, one JSON object per line.

use serde::Deserialize;
use serde_json::Value;

use crate::error::SessionError;
use crate::transcript::{
    AssistantMessage, ContentBlock, Message, ResultMessage, SystemMessage, UserMessage,
};

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    content: WireContent,
    #[serde(default)]
    model: Option<String>,
}

/// User content is either a bare string or a block list.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for WireContent {
    fn default() -> Self {
        WireContent::Blocks(Vec::new())
    }
}

impl WireContent {
    fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            WireContent::Text(text) => vec![ContentBlock::Text { text }],
            WireContent::Blocks(blocks) => blocks,
        }
    }
}

/// Decode one output line.
///
/// Blank lines and message types the harness does not model yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<Message>, SessionError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line).map_err(|e| decode_error(line, e))?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| decode_error(line, "missing 'type'"))?
        .to_string();

    let message = match kind.as_str() {
        "assistant" => {
            let parent_tool_use_id = value
                .get("parent_tool_use_id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let envelope = envelope(&value, line)?;
            Message::Assistant(AssistantMessage {
                content: envelope.content.into_blocks(),
                model: envelope.model,
                parent_tool_use_id,
            })
        }
        "user" => Message::User(UserMessage {
            content: envelope(&value, line)?.content.into_blocks(),
        }),
        "system" => Message::System(SystemMessage {
            subtype: value
                .get("subtype")
                .and_then(|s| s.as_str())
                .unwrap_or_default()
                .to_string(),
            data: value,
        }),
        "result" => Message::Result(
            ResultMessage::deserialize(&value).map_err(|e| decode_error(line, e))?,
        ),
        other => {
            tracing::debug!(message_type = other, "skipping unmodelled runtime message");
            return Ok(None);
        }
    };

    Ok(Some(message))
}

fn envelope(value: &Value, line: &str) -> Result<WireEnvelope, SessionError> {
    let message = value
        .get("message")
        .ok_or_else(|| decode_error(line, "missing 'message'"))?;
    WireEnvelope::deserialize(message).map_err(|e| decode_error(line, e))
}

fn decode_error(line: &str, reason: impl std::fmt::Display) -> SessionError {
    SessionError::Decode {
        line: crate::transcript::projection::truncate_at_char_boundary(line, 200).to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_assistant_with_tool_use() {
        let line = r#"{"type":"assistant","message":{"id":"msg_1","model":"claude-haiku","content":[{"type":"text","text":"Reading"},{"type":"tool_use","id":"toolu_1","name":"Read","input":{"file_path":"/p/a.java"}}]},"parent_tool_use_id":null,"session_id":"s"}"#;
        let message = decode_line(line).unwrap().unwrap();
        match message {
            Message::Assistant(a) => {
                assert_eq!(a.model.as_deref(), Some("claude-haiku"));
                assert_eq!(a.content.len(), 2);
                assert!(matches!(
                    &a.content[1],
                    ContentBlock::ToolUse { name, .. } if name == "Read"
                ));
                assert!(a.parent_tool_use_id.is_none());
            }
            other => panic!("expected assistant, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_hook_response_keeps_raw_data() {
        let line = r#"{"type":"system","subtype":"hook_response","hook_name":"SessionStart","stdout":"Lutece rules loaded","exit_code":0}"#;
        match decode_line(line).unwrap().unwrap() {
            Message::System(s) => {
                assert!(s.is_hook_response());
                assert_eq!(s.stdout(), "Lutece rules loaded");
                assert_eq!(s.data["hook_name"], "SessionStart");
            }
            other => panic!("expected system, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_user_string_content() {
        let line = r#"{"type":"user","message":{"role":"user","content":"plain text"}}"#;
        match decode_line(line).unwrap().unwrap() {
            Message::User(u) => assert_eq!(
                u.content,
                vec![ContentBlock::Text {
                    text: "plain text".to_string()
                }]
            ),
            other => panic!("expected user, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_result() {
        let line = r#"{"type":"result","subtype":"error_max_turns","is_error":true,"num_turns":10,"duration_ms":5000,"total_cost_usd":0.02,"session_id":"s"}"#;
        match decode_line(line).unwrap().unwrap() {
            Message::Result(r) => {
                assert_eq!(r.subtype, "error_max_turns");
                assert!(r.is_error);
                assert_eq!(r.num_turns, 10);
                assert_eq!(r.total_cost_usd, Some(0.02));
                assert!(r.result.is_none());
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[test]
    fn test_unmodelled_and_blank_lines_skipped() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("   ").unwrap().is_none());
        assert!(decode_line(r#"{"type":"stream_event","event":{}}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(matches!(
            decode_line("not json"),
            Err(SessionError::Decode { .. })
        ));
        assert!(matches!(
            decode_line(r#"{"no_type":1}"#),
            Err(SessionError::Decode { .. })
        ));
        assert!(matches!(
            decode_line(r#"{"type":"assistant"}"#),
            Err(SessionError::Decode { .. })
        ));
    }
}
