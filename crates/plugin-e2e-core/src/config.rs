//! Harness configuration
//!
//! Configuration lives in an optional `plugin-e2e.toml` at the project root. Every key has a
//! built-in default, so an absent file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};
use crate::session::{PermissionMode, SettingSource, SystemPrompt};

/// Default config file name, resolved against the project root
pub const CONFIG_FILE: &str = "plugin-e2e.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Declarative case source (`.json` or `.yaml`)
    pub cases: PathBuf,
    /// Directory holding one subdirectory per project fixture
    pub fixtures_dir: PathBuf,
    /// Plugin under test, registered with the runtime as a local plugin
    pub plugin_path: PathBuf,
    /// Markdown report, overwritten at the end of every run
    pub report_path: PathBuf,
    /// Parent of per-run scratch directories (system temp dir when unset)
    pub scratch_root: Option<PathBuf>,
    /// Where per-case transcripts and event logs are kept (disabled when unset)
    pub artifacts_dir: Option<PathBuf>,
    /// Number of cases executed concurrently
    pub jobs: usize,
    pub defaults: CaseDefaults,
    pub runtime: RuntimeSettings,
    pub limits: Limits,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cases: PathBuf::from("tests/tests.json"),
            fixtures_dir: PathBuf::from("tests/fixtures"),
            plugin_path: PathBuf::from("."),
            report_path: PathBuf::from("TEST_REPORT.md"),
            scratch_root: None,
            artifacts_dir: None,
            jobs: 1,
            defaults: CaseDefaults::default(),
            runtime: RuntimeSettings::default(),
            limits: Limits::default(),
        }
    }
}

/// Values applied to case records that omit the corresponding key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseDefaults {
    pub model: String,
    pub max_turns: u32,
    pub allowed_tools: Vec<String>,
}

impl Default for CaseDefaults {
    fn default() -> Self {
        Self {
            model: "haiku".to_string(),
            max_turns: 10,
            allowed_tools: vec!["Read".to_string(), "Glob".to_string()],
        }
    }
}

/// How the external agent runtime is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    pub command: String,
    pub args: Vec<String>,
    pub permission_mode: PermissionMode,
    pub system_prompt: SystemPrompt,
    pub setting_sources: Vec<SettingSource>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: Vec::new(),
            permission_mode: PermissionMode::BypassPermissions,
            system_prompt: SystemPrompt::default(),
            setting_sources: vec![SettingSource::Project],
        }
    }
}

impl RuntimeSettings {
    /// Replace command and extra args from a shell-style command line.
    pub fn set_command_line(&mut self, command_line: &str) -> Result<()> {
        let mut parts = shlex::split(command_line)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| {
                HarnessError::UsageError(format!("invalid agent command: {}", command_line))
            })?;
        self.command = parts.remove(0);
        self.args = parts;
        Ok(())
    }
}

/// Bounds applied to captured session text and to failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Cap on concatenated hook output / response text before matching
    pub max_projection_bytes: usize,
    /// Cap on a single assertion diagnostic
    pub diagnostic_chars: usize,
    /// Cap on the failure message shown in the report table
    pub status_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_projection_bytes: 1 << 20,
            diagnostic_chars: 500,
            status_chars: 80,
        }
    }
}

impl HarnessConfig {
    /// Load configuration for a project root.
    ///
    /// An explicit path must exist. Without one, `<root>/plugin-e2e.toml` is used when present
    /// and built-in defaults otherwise.
    pub fn load_or_default(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = root.join(CONFIG_FILE);
                if path.exists() {
                    Self::load(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: HarnessConfig = toml::from_str(&content).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if config.jobs == 0 {
            return Err(HarnessError::Config {
                path: path.to_path_buf(),
                reason: "jobs must be at least 1".to_string(),
            });
        }

        Ok(config)
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Parent directory for this run's scratch directories.
    pub fn scratch_root(&self, root: &Path) -> PathBuf {
        match &self.scratch_root {
            Some(path) => self.resolve(root, path),
            None => std::env::temp_dir().join("plugin-e2e"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.defaults.model, "haiku");
        assert_eq!(config.defaults.max_turns, 10);
        assert_eq!(config.defaults.allowed_tools, vec!["Read", "Glob"]);
        assert_eq!(config.runtime.command, "claude");
        assert_eq!(config.limits.diagnostic_chars, 500);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
cases = "e2e/cases.yaml"
jobs = 4

[defaults]
model = "sonnet"

[runtime]
system_prompt = { text = "You are terse." }
"#,
        )
        .unwrap();

        let config = HarnessConfig::load_or_default(dir.path(), None).unwrap();
        assert_eq!(config.cases, PathBuf::from("e2e/cases.yaml"));
        assert_eq!(config.jobs, 4);
        assert_eq!(config.defaults.model, "sonnet");
        assert_eq!(config.defaults.max_turns, 10);
        assert_eq!(
            config.runtime.system_prompt,
            SystemPrompt::Text("You are terse.".to_string())
        );
        assert_eq!(config.fixtures_dir, PathBuf::from("tests/fixtures"));
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load_or_default(dir.path(), None).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = HarnessConfig::load_or_default(dir.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "cases_file = \"x.json\"\n").unwrap();
        assert!(HarnessConfig::load(&path).is_err());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "jobs = 0\n").unwrap();
        assert!(HarnessConfig::load(&path).is_err());
    }

    #[test]
    fn test_set_command_line() {
        let mut runtime = RuntimeSettings::default();
        runtime
            .set_command_line("npx '@anthropic-ai/claude-code' --debug")
            .unwrap();
        assert_eq!(runtime.command, "npx");
        assert_eq!(runtime.args, vec!["@anthropic-ai/claude-code", "--debug"]);

        assert!(runtime.set_command_line("   ").is_err());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = HarnessConfig::default();
        let root = Path::new("/work/plugin");
        assert_eq!(
            config.resolve(root, &config.cases),
            PathBuf::from("/work/plugin/tests/tests.json")
        );
        assert_eq!(
            config.resolve(root, Path::new("/abs/report.md")),
            PathBuf::from("/abs/report.md")
        );
    }
}
