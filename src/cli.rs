//! CLI argument parsing for plugin-e2e
//!
//! Global flags: --root, --config, --quiet, --verbose, --log-level, --log-json

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Declarative end-to-end test harness for agent-runtime plugins
#[derive(Parser, Debug)]
#[command(name = "plugin-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root; config, case source and fixtures resolve against it
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/plugin-e2e.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. `debug`, `plugin_e2e_core::session=trace`)
    #[arg(long, global = true, env = "PLUGIN_E2E_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run test cases and write the report
    Run(RunArgs),

    /// List declared test cases
    List {
        /// Only cases of this type
        #[arg(long = "type", short = 'T')]
        case_type: Option<String>,
    },

    /// Print one resolved test case as JSON
    Show {
        /// Case name
        name: String,
    },

    /// Validate the case source and fixtures without running anything
    Check,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Run only this case (repeatable)
    #[arg(long = "case", value_name = "NAME")]
    pub cases: Vec<String>,

    /// Run only cases of this type
    #[arg(long = "type", short = 'T')]
    pub case_type: Option<String>,

    /// Cases executed concurrently (overrides config)
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Replay recorded sessions from DIR/<case>.jsonl instead of starting the agent
    #[arg(long, value_name = "DIR")]
    pub replay: Option<PathBuf>,

    /// Report path (overrides config)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Agent command line (overrides config), e.g. "claude --debug"
    #[arg(long)]
    pub agent_command: Option<String>,

    /// Plugin under test (overrides config)
    #[arg(long)]
    pub plugin: Option<PathBuf>,

    /// Keep per-case transcripts and event logs under DIR (overrides config)
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    /// Leave sandboxes on disk after the run
    #[arg(long)]
    pub keep_sandboxes: bool,
}
