#![allow(dead_code)]

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for plugin-e2e
pub fn plugin_e2e() -> Command {
    cargo_bin_cmd!("plugin-e2e")
}

/// A throwaway plugin project: config, case source, one fixture and replay recordings.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new(cases_json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("tests/fixtures/referencelist-v7/src")).unwrap();
        fs::write(
            root.join("tests/fixtures/referencelist-v7/pom.xml"),
            "<project><artifactId>plugin-referencelist</artifactId></project>",
        )
        .unwrap();
        fs::write(
            root.join("tests/fixtures/referencelist-v7/src/ReferenceDAO.java"),
            "public class ReferenceDAO {}",
        )
        .unwrap();
        fs::write(root.join("tests/tests.json"), cases_json).unwrap();
        fs::write(
            root.join("plugin-e2e.toml"),
            "scratch_root = \"scratch\"\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("recordings")).unwrap();

        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Record the stream-json lines a replayed session for `case` will emit.
    pub fn record(&self, case: &str, lines: &[&str]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(self.path(&format!("recordings/{}.jsonl", case)), content).unwrap();
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = plugin_e2e();
        cmd.arg("--root").arg(self.root());
        cmd
    }
}

pub const SAMPLE_CASES: &str = r#"[
    {
        "name": "hook-fires",
        "type": "hook",
        "description": "SessionStart hook injects conventions",
        "project": "referencelist-v7",
        "prompt": "Say hello",
        "assert_hook_output": ["lutece conventions"]
    },
    {
        "name": "reads-dao",
        "type": "skill",
        "description": "Agent inspects the DAO",
        "project": "referencelist-v7",
        "prompt": "Explain the DAO layer",
        "max_turns": 5,
        "allowed_tools": ["Read", "Glob", "Skill"],
        "assert_tool_read": ["ReferenceDAO"],
        "assert_skill_used": ["lutece-dao"]
    },
    {
        "name": "writes-notes",
        "project": "referencelist-v7",
        "prompt": "Write notes.txt",
        "assert_file_exists": ["notes.txt"]
    }
]"#;

pub const HOOK_LINE: &str = r#"{"type":"system","subtype":"hook_response","hook_name":"SessionStart","stdout":"Lutece Conventions loaded","exit_code":0}"#;
pub const READ_DAO_LINE: &str = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{"file_path":"src/ReferenceDAO.java"}}]}}"#;
pub const SKILL_LINE: &str = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t2","name":"Skill","input":{"skill":"lutece-dao"}}]}}"#;
pub const DONE_LINE: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"All done."}]}}"#;
pub const RESULT_LINE: &str = r#"{"type":"result","subtype":"success","is_error":false,"num_turns":2,"duration_ms":900}"#;

/// Whether git is usable; runs cannot provision sandboxes without it.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
