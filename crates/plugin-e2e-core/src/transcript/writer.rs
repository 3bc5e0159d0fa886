use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde_json::json;

use super::types::Transcript;
use crate::error::Result;

/// Per-case artifact directory: decoded transcript plus an event log.
pub struct TranscriptWriter {
    pub base_dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir)?;
        }
        Ok(Self { base_dir })
    }

    /// Write every message as one JSON line to `transcript.jsonl`.
    pub fn write_transcript(&self, transcript: &Transcript) -> Result<()> {
        let mut out = String::new();
        for message in transcript.messages() {
            out.push_str(&serde_json::to_string(message)?);
            out.push('\n');
        }
        fs::write(self.base_dir.join("transcript.jsonl"), out)?;
        Ok(())
    }

    pub fn append_event(&self, event: &serde_json::Value) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.base_dir.join("events.jsonl"))?;
        writeln!(file, "{}", serde_json::to_string(event)?)?;
        Ok(())
    }

    pub fn log_event(&self, event: &str, fields: serde_json::Value) -> Result<()> {
        let mut record = json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "event": event,
        });
        if let (Some(target), serde_json::Value::Object(extra)) = (record.as_object_mut(), fields)
        {
            target.extend(extra);
        }
        self.append_event(&record)
    }
}
