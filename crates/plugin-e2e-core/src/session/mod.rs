//! Session driver: one asynchronous agent session per test case.
//!
//! The driver knows nothing about how the runtime is reached. It opens a stream through an
//! [`AgentRuntime`], appends every message in arrival order, and hands back the completed
//! [`Transcript`]. Turn budgets and tool permissions travel in the [`SessionConfig`] and are
//! enforced by the runtime itself; the driver imposes no timeout of its own.

pub mod claude;
pub mod replay;
pub mod wire;

pub use claude::ClaudeCliRuntime;
pub use replay::ReplayRuntime;

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::case::TestCase;
use crate::config::RuntimeSettings;
use crate::error::SessionError;
use crate::transcript::{Message, Transcript};

/// Live message stream of one session; ends when the runtime closes it.
pub type MessageStream = BoxStream<'static, Result<Message, SessionError>>;

/// An external agent runtime that can run one prompt to completion.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Start a session and return its message stream.
    async fn query(&self, prompt: &str, config: &SessionConfig)
        -> Result<MessageStream, SessionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    BypassPermissions,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// System prompt selection: a named runtime preset or literal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPrompt {
    Preset(String),
    Text(String),
}

impl Default for SystemPrompt {
    fn default() -> Self {
        SystemPrompt::Preset("claude_code".to_string())
    }
}

/// Which on-disk settings scopes the runtime may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    User,
    Project,
    Local,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingSource::User => "user",
            SettingSource::Project => "project",
            SettingSource::Local => "local",
        }
    }
}

/// A plugin registered with the runtime for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginRef {
    Local { path: PathBuf },
}

/// Resolved launch parameters for one session. Built once, never mutated after start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// Case name; identifies the session in logs and replay files
    pub run_id: String,
    pub cwd: PathBuf,
    pub max_turns: u32,
    pub model: String,
    pub allowed_tools: Vec<String>,
    pub permission_mode: PermissionMode,
    pub system_prompt: SystemPrompt,
    pub setting_sources: Vec<SettingSource>,
    pub plugins: Vec<PluginRef>,
}

impl SessionConfig {
    pub fn for_case(
        case: &TestCase,
        sandbox_root: &Path,
        plugin_path: &Path,
        runtime: &RuntimeSettings,
    ) -> Self {
        Self {
            run_id: case.name.clone(),
            cwd: sandbox_root.to_path_buf(),
            max_turns: case.max_turns,
            model: case.model.clone(),
            allowed_tools: case.allowed_tools.clone(),
            permission_mode: runtime.permission_mode,
            system_prompt: runtime.system_prompt.clone(),
            setting_sources: runtime.setting_sources.clone(),
            plugins: vec![PluginRef::Local {
                path: plugin_path.to_path_buf(),
            }],
        }
    }
}

/// Drive one session to completion and collect its transcript.
///
/// Any transport error is returned as-is and the partial transcript is dropped.
pub async fn run(
    runtime: &dyn AgentRuntime,
    config: &SessionConfig,
    prompt: &str,
) -> Result<Transcript, SessionError> {
    let start = Instant::now();
    tracing::debug!(
        run_id = %config.run_id,
        runtime = runtime.name(),
        model = %config.model,
        max_turns = config.max_turns,
        "session_start"
    );

    let mut stream = runtime.query(prompt, config).await?;
    let mut transcript = Transcript::new();
    while let Some(message) = stream.next().await {
        transcript.push(message?);
    }

    tracing::debug!(
        run_id = %config.run_id,
        messages = transcript.len(),
        elapsed = ?start.elapsed(),
        "session_complete"
    );
    Ok(transcript)
}
