//! Error types and exit codes for plugin-e2e
//!
//! Exit codes:
//! - 0: Success (every executed case passed)
//! - 1: Generic failure (a case failed, runtime or IO failure, interrupted run)
//! - 2: Usage error (bad flags/args)
//! - 3: Data error (unreadable case source, invalid declarations, bad config)

use std::path::PathBuf;
use thiserror::Error;

use crate::evaluation::AssertionKind;

/// Exit codes for the plugin-e2e binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - case source, fixtures or config (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Transport-level failures raised while talking to the agent runtime.
///
/// These abort the case they occur in; the partial transcript is discarded.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to spawn agent runtime `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent runtime stream failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed runtime message ({reason}): {line}")]
    Decode { line: String, reason: String },

    #[error("agent runtime exited with {status} before completing the session: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    #[error("cannot replay transcript {path:?}: {reason}")]
    Replay { path: PathBuf, reason: String },
}

/// Errors that can occur during plugin-e2e operations
#[derive(Error, Debug)]
pub enum HarnessError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    // Data errors (exit code 3)
    #[error("cannot load test cases from {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("duplicate test case name: {name}")]
    DuplicateCase { name: String },

    #[error("test case '{case}' declares unknown assertion '{key}'")]
    UnknownAssertion { case: String, key: String },

    #[error("invalid test case '{case}': {reason}")]
    InvalidCase { case: String, reason: String },

    #[error("invalid config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("fixture not found: {path:?}")]
    FixtureNotFound { path: PathBuf },

    // Generic failures (exit code 1)
    #[error("failed to {operation} {target}: {reason}")]
    Provision {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("{diagnostic}")]
    AssertionFailed {
        kind: AssertionKind,
        diagnostic: String,
    },

    #[error("{failed} of {total} test cases failed")]
    CasesFailed { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Run interrupted. Report covers only the cases executed so far.")]
    Interrupted,
}

impl HarnessError {
    /// Create an error for a failed sandbox provisioning step
    pub fn provision(
        operation: &str,
        target: impl std::fmt::Display,
        reason: impl std::fmt::Display,
    ) -> Self {
        HarnessError::Provision {
            operation: operation.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for an unreadable or malformed case source
    pub fn load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        HarnessError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for an invalid case declaration
    pub fn invalid_case(case: &str, reason: impl std::fmt::Display) -> Self {
        HarnessError::InvalidCase {
            case: case.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            HarnessError::UsageError(_) => ExitCode::Usage,

            HarnessError::Load { .. }
            | HarnessError::DuplicateCase { .. }
            | HarnessError::UnknownAssertion { .. }
            | HarnessError::InvalidCase { .. }
            | HarnessError::Config { .. }
            | HarnessError::FixtureNotFound { .. }
            | HarnessError::Yaml(_)
            | HarnessError::Json(_)
            | HarnessError::Toml(_) => ExitCode::Data,

            HarnessError::Provision { .. }
            | HarnessError::Session(_)
            | HarnessError::AssertionFailed { .. }
            | HarnessError::CasesFailed { .. }
            | HarnessError::Io(_)
            | HarnessError::Interrupted => ExitCode::Failure,
        }
    }
}

/// Result type alias for plugin-e2e operations
pub type Result<T> = std::result::Result<T, HarnessError>;
