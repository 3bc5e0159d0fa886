//! `plugin-e2e run` - execute cases and write the report

use std::sync::atomic::Ordering;
use std::sync::Arc;

use plugin_e2e_core::error::{HarnessError, Result};
use plugin_e2e_core::report::CaseOutcome;
use plugin_e2e_core::runner::{self, RunOptions, Runner};
use plugin_e2e_core::sandbox;
use plugin_e2e_core::session::{AgentRuntime, ClaudeCliRuntime, ReplayRuntime};

use super::Context;
use crate::cli::{Cli, RunArgs};

pub fn execute(cli: &Cli, ctx: &Context, args: &RunArgs) -> Result<()> {
    let cases = runner::select_cases(ctx.load_cases()?, &args.cases, args.case_type.as_deref())?;
    if cases.is_empty() {
        tracing::warn!("no test cases selected");
    }

    if !cases.is_empty() && !sandbox::is_git_available() {
        return Err(HarnessError::provision(
            "provision sandboxes in",
            ctx.root.display(),
            "git executable not found on PATH",
        ));
    }

    let options = run_options(ctx, args)?;
    let runtime: Arc<dyn AgentRuntime> = match &args.replay {
        Some(dir) => Arc::new(ReplayRuntime::new(ctx.path(dir))),
        None => Arc::new(ClaudeCliRuntime::new(&options.runtime)),
    };
    tracing::debug!(runtime = runtime.name(), jobs = options.jobs, "starting run");
    let report_path = options.report_path.clone();

    let quiet = cli.quiet;
    let runner = Runner::new(options, runtime).with_progress(move |outcome| {
        if !quiet {
            println!("{}", summary_line(outcome));
        }
    });

    let interrupted = runner.interrupt_flag();
    let _ = ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    });

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let summary = rt.block_on(runner.run(&cases))?;
    let report = &summary.report;

    if !quiet {
        println!(
            "{}/{} passed in {:.1}s; report written to {}",
            report.passed,
            report.total,
            report.duration.as_secs_f64(),
            report_path.display()
        );
        if args.keep_sandboxes {
            println!("sandboxes kept in {}", summary.run_dir.display());
        }
    }

    if summary.interrupted {
        return Err(HarnessError::Interrupted);
    }
    if !report.all_passed() {
        return Err(HarnessError::CasesFailed {
            failed: report.total - report.passed,
            total: report.total,
        });
    }
    Ok(())
}

/// Merge config with command-line overrides.
fn run_options(ctx: &Context, args: &RunArgs) -> Result<RunOptions> {
    let config = &ctx.config;

    let jobs = args.jobs.unwrap_or(config.jobs);
    if jobs == 0 {
        return Err(HarnessError::UsageError(
            "--jobs must be at least 1".to_string(),
        ));
    }

    let mut runtime = config.runtime.clone();
    if let Some(command_line) = &args.agent_command {
        runtime.set_command_line(command_line)?;
    }

    Ok(RunOptions {
        fixtures_dir: ctx.path(&config.fixtures_dir),
        plugin_path: ctx.path(args.plugin.as_ref().unwrap_or(&config.plugin_path)),
        scratch_root: config.scratch_root(&ctx.root),
        artifacts_dir: args
            .artifacts
            .as_ref()
            .or(config.artifacts_dir.as_ref())
            .map(|dir| ctx.path(dir)),
        report_path: ctx.path(args.report.as_ref().unwrap_or(&config.report_path)),
        jobs,
        keep_sandboxes: args.keep_sandboxes,
        runtime,
        limits: config.limits,
    })
}

fn summary_line(outcome: &CaseOutcome) -> String {
    let secs = outcome.duration.as_secs_f64();
    match &outcome.failure {
        None => format!("PASS {} ({:.1}s)", outcome.name, secs),
        Some(failure) => format!("FAIL {} ({:.1}s): {}", outcome.name, secs, failure),
    }
}
