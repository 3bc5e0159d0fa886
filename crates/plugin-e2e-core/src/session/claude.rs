//! Agent runtime reached through the agent CLI's `stream-json` print mode.

use std::collections::VecDeque;
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::wire::decode_line;
use super::{AgentRuntime, MessageStream, SessionConfig, SystemPrompt};
use crate::config::RuntimeSettings;
use crate::error::SessionError;
use crate::transcript::Message;

const STDERR_TAIL_LINES: usize = 20;

type MessageSender = mpsc::Sender<Result<Message, SessionError>>;

/// Spawns the agent CLI once per session and streams its stdout.
#[derive(Debug, Clone)]
pub struct ClaudeCliRuntime {
    command: String,
    args: Vec<String>,
}

impl ClaudeCliRuntime {
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            command: settings.command.clone(),
            args: settings.args.clone(),
        }
    }

    /// Arguments appended after the configured command and extra args.
    pub fn session_args(&self, prompt: &str, config: &SessionConfig) -> Vec<String> {
        let mut args: Vec<String> = ["--output-format", "stream-json", "--verbose"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        args.push("--max-turns".into());
        args.push(config.max_turns.to_string());
        args.push("--model".into());
        args.push(config.model.clone());
        if !config.allowed_tools.is_empty() {
            args.push("--allowedTools".into());
            args.push(config.allowed_tools.join(","));
        }
        args.push("--permission-mode".into());
        args.push(config.permission_mode.as_str().into());
        args.push("--setting-sources".into());
        args.push(
            config
                .setting_sources
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        for plugin in &config.plugins {
            let super::PluginRef::Local { path } = plugin;
            args.push("--plugin-dir".into());
            args.push(path.to_string_lossy().into_owned());
        }
        if let SystemPrompt::Text(text) = &config.system_prompt {
            args.push("--system-prompt".into());
            args.push(text.clone());
        }

        args.push("--print".into());
        args.push("--".into());
        args.push(prompt.to_string());
        args
    }
}

#[async_trait]
impl AgentRuntime for ClaudeCliRuntime {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn query(
        &self,
        prompt: &str,
        config: &SessionConfig,
    ) -> Result<MessageStream, SessionError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .args(self.session_args(prompt, config))
            .current_dir(&config.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SessionError::Spawn {
            command: self.command.clone(),
            source,
        })?;
        debug!(run_id = %config.run_id, pid = ?child.id(), "spawned agent runtime");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Io(std::io::Error::other("stdout unavailable")))?;
        let stderr_tail = child.stderr.take().map(forward_stderr);

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(pump(child, stdout, stderr_tail, tx));

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Decode stdout into the channel, then turn the exit status into a final error if needed.
async fn pump(
    mut child: Child,
    stdout: ChildStdout,
    stderr_tail: Option<JoinHandle<String>>,
    tx: MessageSender,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut saw_result = false;

    loop {
        let item = match lines.next_line().await {
            Ok(Some(line)) => match decode_line(&line) {
                Ok(Some(message)) => {
                    saw_result |= matches!(message, Message::Result(_));
                    Ok(message)
                }
                Ok(None) => continue,
                Err(e) => Err(e),
            },
            Ok(None) => break,
            Err(e) => Err(SessionError::Io(e)),
        };

        let failed = item.is_err();
        // Receiver gone or stream poisoned: dropping `child` kills the process.
        if tx.send(item).await.is_err() || failed {
            return;
        }
    }

    let status = child.wait().await;
    let stderr = match stderr_tail {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };

    match status {
        Ok(status) if status.success() => {}
        Ok(status) if saw_result => {
            warn!(%status, "agent runtime exited non-zero after its result message");
        }
        Ok(status) => {
            let _ = tx
                .send(Err(SessionError::ProcessFailed {
                    status: status.to_string(),
                    stderr,
                }))
                .await;
        }
        Err(e) => {
            let _ = tx.send(Err(SessionError::Io(e))).await;
        }
    }
}

/// Forward stderr through `tracing`, keeping the last lines for error reports.
fn forward_stderr(stderr: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            warn!(target: "plugin_e2e::runtime_stderr", "{line}");
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
        Vec::from(tail).join("\n")
    })
}
