//! plugin-e2e - declarative end-to-end tests for agent-runtime plugins
//!
//! Loads test cases from a JSON/YAML source, runs each against a live (or replayed) agent
//! session inside a fresh sandbox, and writes a markdown report.

mod cli;
mod commands;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use cli::Cli;
use plugin_e2e_core::error::ExitCode as HarnessExitCode;
use plugin_e2e_core::logging;

fn main() -> ExitCode {
    let start = Instant::now();
    let cli = Cli::parse();

    // Initialize structured logging
    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    match commands::run(&cli) {
        Ok(()) => ExitCode::from(HarnessExitCode::Success as u8),
        Err(e) => {
            let exit_code = e.exit_code();
            if !cli.quiet {
                eprintln!("error: {}", e);
            }
            ExitCode::from(exit_code as u8)
        }
    }
}
