//! `plugin-e2e check` - validate cases and fixtures without running sessions

use std::collections::BTreeSet;

use plugin_e2e_core::error::{HarnessError, Result};
use plugin_e2e_core::sandbox;

use super::Context;
use crate::cli::Cli;

pub fn execute(cli: &Cli, ctx: &Context) -> Result<()> {
    let cases = ctx.load_cases()?;
    let fixtures_dir = ctx.path(&ctx.config.fixtures_dir);

    let projects: BTreeSet<&str> = cases.iter().map(|c| c.project.as_str()).collect();
    for project in &projects {
        let fixture = fixtures_dir.join(project);
        if !fixture.is_dir() {
            return Err(HarnessError::FixtureNotFound { path: fixture });
        }
    }

    let plugin_path = ctx.path(&ctx.config.plugin_path);
    if !plugin_path.exists() {
        tracing::warn!(path = %plugin_path.display(), "plugin path does not exist");
    }
    if !sandbox::is_git_available() {
        tracing::warn!("git executable not found on PATH; runs will fail to provision");
    }

    if !cli.quiet {
        println!(
            "ok: {} cases, {} fixtures ({})",
            cases.len(),
            projects.len(),
            ctx.cases_path().display()
        );
    }
    Ok(())
}
