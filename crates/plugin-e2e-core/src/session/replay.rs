//! Runtime that replays previously recorded `stream-json` sessions from disk.
//!
//! Recordings live at `<dir>/<run_id>.jsonl`, in the same line format the CLI runtime emits.
//! Lets a suite be exercised deterministically without a model or network.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;

use super::wire::decode_line;
use super::{AgentRuntime, MessageStream, SessionConfig};
use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct ReplayRuntime {
    dir: PathBuf,
}

impl ReplayRuntime {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn recording_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.jsonl"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AgentRuntime for ReplayRuntime {
    fn name(&self) -> &str {
        "replay"
    }

    async fn query(
        &self,
        _prompt: &str,
        config: &SessionConfig,
    ) -> Result<MessageStream, SessionError> {
        let path = self.recording_path(&config.run_id);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SessionError::Replay {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

        // Decode eagerly so a malformed recording still surfaces at its position in the stream.
        let items: Vec<_> = content
            .lines()
            .filter_map(|line| decode_line(line).transpose())
            .collect();
        tracing::debug!(path = %path.display(), messages = items.len(), "replaying session");

        Ok(futures::stream::iter(items).boxed())
    }
}
