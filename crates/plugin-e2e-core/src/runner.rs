//! Suite runner: executes selected cases and writes the run report.
//!
//! Each case is provisioned, driven and evaluated independently; any error is caught at the
//! case boundary and recorded as a failed outcome. Outcomes stay in registry order even when
//! cases run concurrently, and the report is written exactly once at the end.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::{future, StreamExt};
use serde_json::json;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::case::TestCase;
use crate::config::{Limits, RuntimeSettings};
use crate::error::{HarnessError, Result};
use crate::evaluation::{self, EvalContext};
use crate::report::{CaseOutcome, Report};
use crate::sandbox;
use crate::session::{self, AgentRuntime, SessionConfig};
use crate::trace_time;
use crate::transcript::TranscriptWriter;

/// Resolved inputs for one run. All paths are absolute or relative to the process cwd.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub fixtures_dir: PathBuf,
    pub plugin_path: PathBuf,
    pub scratch_root: PathBuf,
    pub artifacts_dir: Option<PathBuf>,
    pub report_path: PathBuf,
    pub jobs: usize,
    pub keep_sandboxes: bool,
    pub runtime: RuntimeSettings,
    pub limits: Limits,
}

type ProgressFn = dyn Fn(&CaseOutcome) + Send + Sync;

pub struct Runner {
    options: RunOptions,
    runtime: Arc<dyn AgentRuntime>,
    interrupted: Arc<AtomicBool>,
    progress: Option<Arc<ProgressFn>>,
}

/// What a finished (or interrupted) run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub report: Report,
    /// Cases left unscheduled because of an interrupt
    pub skipped: usize,
    pub interrupted: bool,
}

impl Runner {
    pub fn new(options: RunOptions, runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            options,
            runtime,
            interrupted: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Called once per case as its outcome is known.
    pub fn with_progress(mut self, progress: impl Fn(&CaseOutcome) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Setting this flag stops scheduling further cases; running ones finish.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub async fn run(&self, cases: &[TestCase]) -> Result<RunSummary> {
        let start = Instant::now();
        let run_id = Ulid::new().to_string();
        let run_dir = self.options.scratch_root.join(&run_id);
        std::fs::create_dir_all(&run_dir)
            .map_err(|e| HarnessError::provision("create run directory", run_dir.display(), e))?;
        info!(%run_id, cases = cases.len(), jobs = self.options.jobs, "run_start");

        let outcomes: Vec<CaseOutcome> = futures::stream::iter(cases)
            .take_while(|_| future::ready(!self.interrupted.load(Ordering::SeqCst)))
            .map(|case| self.execute_case(case, &run_id, &run_dir))
            .buffered(self.options.jobs.max(1))
            .inspect(|outcome| {
                if let Some(progress) = &self.progress {
                    progress(outcome);
                }
            })
            .collect()
            .await;

        let interrupted = self.interrupted.load(Ordering::SeqCst);
        let skipped = cases.len() - outcomes.len();
        if interrupted {
            warn!(executed = outcomes.len(), skipped, "run interrupted");
        }

        let report = Report::aggregate(outcomes, self.options.limits.status_chars);
        report.write(&self.options.report_path, chrono::Utc::now())?;

        if self.options.keep_sandboxes {
            info!(run_dir = %run_dir.display(), "keeping sandboxes");
        } else if let Err(e) = std::fs::remove_dir_all(&run_dir) {
            warn!(run_dir = %run_dir.display(), error = %e, "failed to remove run directory");
        }

        trace_time!(start, "run", run_id = run_id.as_str());
        Ok(RunSummary {
            run_id,
            run_dir,
            report,
            skipped,
            interrupted,
        })
    }

    /// Execute one case end to end. Never fails: errors become a failed outcome.
    pub async fn execute_case(&self, case: &TestCase, run_id: &str, run_dir: &Path) -> CaseOutcome {
        let start = Instant::now();
        let result = self.try_case(case, run_id, run_dir).await;
        let duration = start.elapsed();

        match result {
            Ok(()) => {
                info!(case = %case.name, ?duration, "case passed");
                CaseOutcome::pass(case, duration)
            }
            Err(e) => {
                info!(case = %case.name, ?duration, error = %e, "case failed");
                CaseOutcome::fail(case, duration, &e)
            }
        }
    }

    async fn try_case(&self, case: &TestCase, run_id: &str, run_dir: &Path) -> Result<()> {
        let artifacts = match &self.options.artifacts_dir {
            Some(dir) => Some(TranscriptWriter::new(dir.join(run_id).join(&case.name))?),
            None => None,
        };

        let fixtures_dir = self.options.fixtures_dir.clone();
        let project = case.project.clone();
        let case_dir = run_dir.join(&case.name);
        let sandbox = tokio::task::spawn_blocking(move || {
            sandbox::provision(&fixtures_dir, &project, &case_dir)
        })
        .await
        .map_err(|e| HarnessError::provision("provision", &case.project, e))??;

        if let Some(writer) = &artifacts {
            writer.log_event(
                "provisioned",
                json!({
                    "case": case.name,
                    "root": sandbox.root,
                    "baseline": sandbox.baseline,
                    "fixture_digest": sandbox.fixture_digest,
                }),
            )?;
        }

        let config = SessionConfig::for_case(
            case,
            &sandbox.root,
            &self.options.plugin_path,
            &self.options.runtime,
        );
        let session_start = Instant::now();
        let transcript = session::run(self.runtime.as_ref(), &config, &case.prompt).await?;
        trace_time!(session_start, "session", case = case.name.as_str());

        if let Some(writer) = &artifacts {
            writer.write_transcript(&transcript)?;
            writer.log_event(
                "session_complete",
                json!({
                    "runtime": self.runtime.name(),
                    "config": config,
                    "messages": transcript.len(),
                    "result": transcript.result(),
                }),
            )?;
        }

        let limits = self.options.limits;
        let ctx = EvalContext {
            sandbox_root: &sandbox.root,
            transcript: &transcript,
            limits: &limits,
        };
        let eval_start = Instant::now();
        let verdict = evaluation::evaluate(case, &ctx);
        trace_time!(eval_start, "evaluate", case = case.name.as_str());
        debug!(case = %case.name, passed = verdict.passed(), "evaluated");

        if let Some(writer) = &artifacts {
            writer.log_event(
                "evaluated",
                json!({ "passed": verdict.passed(), "results": verdict.results }),
            )?;
        }

        verdict.into_result()
    }
}

/// Narrow `cases` to the named ones and/or one type, keeping registry order.
///
/// Naming a case that does not exist is a usage error.
pub fn select_cases(
    cases: Vec<TestCase>,
    names: &[String],
    case_type: Option<&str>,
) -> Result<Vec<TestCase>> {
    if let Some(missing) = names.iter().find(|n| !cases.iter().any(|c| &c.name == *n)) {
        return Err(HarnessError::UsageError(format!(
            "no test case named '{}'",
            missing
        )));
    }

    Ok(cases
        .into_iter()
        .filter(|c| names.is_empty() || names.contains(&c.name))
        .filter(|c| case_type.map_or(true, |t| c.type_label() == t))
        .collect())
}

#[cfg(test)]
mod tests;
