use serde::{Deserialize, Serialize};

/// One message received from the agent runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Assistant(AssistantMessage),
    User(UserMessage),
    System(SystemMessage),
    Result(ResultMessage),
}

impl Message {
    /// Assistant message holding a single text block.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: vec![ContentBlock::Text { text: text.into() }],
            model: None,
            parent_tool_use_id: None,
        })
    }

    /// Assistant message holding a single tool invocation.
    pub fn tool_use(name: impl Into<String>, input: serde_json::Value) -> Self {
        Message::Assistant(AssistantMessage {
            content: vec![ContentBlock::ToolUse {
                id: String::new(),
                name: name.into(),
                input,
            }],
            model: None,
            parent_tool_use_id: None,
        })
    }

    /// `hook_response` system message with the given stdout.
    pub fn hook_response(stdout: impl Into<String>) -> Self {
        Message::System(SystemMessage {
            subtype: HOOK_RESPONSE_SUBTYPE.to_string(),
            data: serde_json::json!({
                "type": "system",
                "subtype": HOOK_RESPONSE_SUBTYPE,
                "stdout": stdout.into(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
}

/// Tool results fed back to the model by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: Vec<ContentBlock>,
}

/// Runtime-side events (`init`, `hook_response`, ...). `data` is the full raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub subtype: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SystemMessage {
    pub fn is_hook_response(&self) -> bool {
        self.subtype == HOOK_RESPONSE_SUBTYPE
    }

    /// Captured standard output, empty when the record has none.
    pub fn stdout(&self) -> &str {
        self.data
            .get("stdout")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Terminal summary emitted once the runtime ends the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub subtype: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// System message subtype carrying hook stdout.
pub const HOOK_RESPONSE_SUBTYPE: &str = "hook_response";

/// Ordered, append-only record of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The terminal `result` message, if the runtime sent one.
    pub fn result(&self) -> Option<&ResultMessage> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Result(r) => Some(r),
            _ => None,
        })
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
