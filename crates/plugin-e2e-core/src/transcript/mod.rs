//! Session transcripts: the message model, projections over it, and artifact output.

pub mod projection;
pub mod types;
pub mod writer;


pub use projection::{
    hook_outputs, read_paths, response_text, skill_invocations, tool_invocations,
    tool_names_used, ToolInvocation, READ_TOOL, SKILL_TOOL,
};
pub use types::{
    AssistantMessage, ContentBlock, Message, ResultMessage, SystemMessage, Transcript,
    UserMessage, HOOK_RESPONSE_SUBTYPE,
};
pub use writer::TranscriptWriter;
