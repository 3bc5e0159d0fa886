use super::*;
use crate::case::{self, SourceFormat};
use crate::config::CaseDefaults;
use crate::error::SessionError;
use crate::session::MessageStream;
use crate::transcript::Message;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Per-case scripted behaviour: files the "agent" writes and the messages it emits.
#[derive(Default, Clone)]
struct Script {
    writes: Vec<(&'static str, &'static str)>,
    messages: Vec<Message>,
}

#[derive(Default)]
struct FakeRuntime {
    scripts: HashMap<String, Script>,
    started: Mutex<Vec<String>>,
}

#[async_trait]
impl AgentRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn query(
        &self,
        _prompt: &str,
        config: &SessionConfig,
    ) -> std::result::Result<MessageStream, SessionError> {
        self.started.lock().unwrap().push(config.run_id.clone());
        let script = self.scripts.get(&config.run_id).cloned().unwrap_or_default();
        for (path, content) in script.writes {
            fs::write(config.cwd.join(path), content)?;
        }
        Ok(futures::stream::iter(script.messages.into_iter().map(Ok)).boxed())
    }
}

struct Harness {
    _dir: TempDir,
    options: RunOptions,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = dir.path().join("fixtures");
    fs::create_dir_all(fixtures.join("referencelist-v7/src")).unwrap();
    fs::write(fixtures.join("referencelist-v7/pom.xml"), "<project/>").unwrap();

    let options = RunOptions {
        fixtures_dir: fixtures,
        plugin_path: dir.path().join("plugin"),
        scratch_root: dir.path().join("scratch"),
        artifacts_dir: None,
        report_path: dir.path().join("TEST_REPORT.md"),
        jobs: 1,
        keep_sandboxes: false,
        runtime: RuntimeSettings::default(),
        limits: Limits::default(),
    };
    Harness { _dir: dir, options }
}

fn cases() -> Vec<TestCase> {
    let source = r#"[
        {
            "name": "hook-fires",
            "type": "hook",
            "description": "Session hook injects conventions",
            "project": "referencelist-v7",
            "prompt": "Say hi",
            "assert_hook_output": ["conventions"]
        },
        {
            "name": "writes-notes",
            "type": "skill",
            "project": "referencelist-v7",
            "prompt": "Write notes",
            "assert_file_exists": ["notes.txt"]
        },
        {
            "name": "reads-pom",
            "type": "hook",
            "project": "referencelist-v7",
            "prompt": "Read the pom",
            "assert_tool_read": ["pom.xml"],
            "assert_response_contains": ["project"]
        }
    ]"#;
    case::parse(source, SourceFormat::Json, &CaseDefaults::default()).unwrap()
}

fn runtime() -> FakeRuntime {
    let mut scripts = HashMap::new();
    scripts.insert(
        "hook-fires".to_string(),
        Script {
            messages: vec![Message::hook_response("Lutece Conventions loaded")],
            ..Script::default()
        },
    );
    // Writes nothing, so its file-exists assertion fails.
    scripts.insert("writes-notes".to_string(), Script::default());
    scripts.insert(
        "reads-pom".to_string(),
        Script {
            writes: vec![("summary.md", "read it")],
            messages: vec![
                Message::tool_use("Read", json!({ "file_path": "/sb/pom.xml" })),
                Message::assistant_text("It is a Maven Project."),
            ],
        },
    );
    FakeRuntime {
        scripts,
        ..FakeRuntime::default()
    }
}

fn git_missing() -> bool {
    if sandbox::is_git_available() {
        return false;
    }
    eprintln!("git not available, skipping");
    true
}

#[tokio::test]
async fn test_run_reports_every_case_in_order() {
    if git_missing() {
        return;
    }
    let h = harness();
    let runner = Runner::new(h.options.clone(), Arc::new(runtime()));

    let summary = runner.run(&cases()).await.unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.report.passed, 2);
    assert_eq!(summary.report.total, 3);

    let groups: Vec<_> = summary
        .report
        .groups
        .iter()
        .map(|g| (g.case_type.as_str(), g.outcomes.len()))
        .collect();
    assert_eq!(groups, vec![("hook", 2), ("skill", 1)]);

    let failed = &summary.report.groups[1].outcomes[0];
    assert_eq!(failed.name, "writes-notes");
    assert_eq!(
        failed.failure.as_deref(),
        Some("Expected file not found: notes.txt")
    );

    let written = fs::read_to_string(&h.options.report_path).unwrap();
    assert!(written.contains("**Result:** 2/3 passed"));
    assert!(written.contains("| writes-notes |  | FAIL: Expected file not found: notes.txt |"));

    // Scratch run directory is torn down.
    assert!(!summary.run_dir.exists());
}

#[tokio::test]
async fn test_sandbox_per_case_and_kept_on_request() {
    if git_missing() {
        return;
    }
    let h = harness();
    let mut options = h.options.clone();
    options.keep_sandboxes = true;
    let runner = Runner::new(options, Arc::new(runtime()));

    let summary = runner.run(&cases()).await.unwrap();

    let reads_pom = summary.run_dir.join("reads-pom/referencelist-v7");
    assert!(reads_pom.join("pom.xml").is_file());
    assert!(reads_pom.join("summary.md").is_file());
    // Another case's sandbox never sees that write.
    assert!(!summary
        .run_dir
        .join("hook-fires/referencelist-v7/summary.md")
        .exists());
}

#[tokio::test]
async fn test_provision_failure_is_isolated() {
    if git_missing() {
        return;
    }
    let h = harness();
    let mut all = cases();
    all[1].project = "missing-fixture".to_string();
    let fake = Arc::new(runtime());
    let runner = Runner::new(h.options.clone(), fake.clone());

    let summary = runner.run(&all).await.unwrap();

    assert_eq!(summary.report.passed, 2);
    let failed = &summary.report.groups[1].outcomes[0];
    assert!(failed
        .failure
        .as_deref()
        .unwrap()
        .starts_with("fixture not found"));
    // No session is started for a case whose sandbox failed.
    assert_eq!(
        *fake.started.lock().unwrap(),
        vec!["hook-fires".to_string(), "reads-pom".to_string()]
    );
}

#[tokio::test]
async fn test_parallel_run_keeps_registry_order() {
    if git_missing() {
        return;
    }
    let h = harness();
    let mut options = h.options.clone();
    options.jobs = 3;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress_seen = Arc::clone(&seen);
    let runner = Runner::new(options, Arc::new(runtime()))
        .with_progress(move |outcome| progress_seen.lock().unwrap().push(outcome.name.clone()));

    let summary = runner.run(&cases()).await.unwrap();

    assert_eq!(summary.report.total, 3);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["hook-fires", "writes-notes", "reads-pom"]
    );
}

#[tokio::test]
async fn test_interrupt_before_start_writes_empty_report() {
    let h = harness();
    let runner = Runner::new(h.options.clone(), Arc::new(runtime()));
    runner.interrupt_flag().store(true, Ordering::SeqCst);

    let summary = runner.run(&cases()).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.report.total, 0);
    let written = fs::read_to_string(&h.options.report_path).unwrap();
    assert!(written.contains("**Result:** 0/0 passed"));
}

#[tokio::test]
async fn test_artifacts_written_per_case() {
    if git_missing() {
        return;
    }
    let h = harness();
    let mut options = h.options.clone();
    let artifacts = h.options.scratch_root.with_file_name("artifacts");
    options.artifacts_dir = Some(artifacts.clone());
    let runner = Runner::new(options, Arc::new(runtime()));

    let summary = runner.run(&cases()[2..]).await.unwrap();

    let case_dir = artifacts.join(&summary.run_id).join("reads-pom");
    let transcript = fs::read_to_string(case_dir.join("transcript.jsonl")).unwrap();
    assert_eq!(transcript.lines().count(), 2);

    let events: Vec<serde_json::Value> = fs::read_to_string(case_dir.join("events.jsonl"))
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let names: Vec<_> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["provisioned", "session_complete", "evaluated"]);
    assert_eq!(events[1]["config"]["model"], "haiku");
    assert_eq!(events[2]["passed"], true);
}

#[test]
fn test_select_cases() {
    let all = cases();

    let hooks = select_cases(all.clone(), &[], Some("hook")).unwrap();
    assert_eq!(
        hooks.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["hook-fires", "reads-pom"]
    );

    let named = select_cases(
        all.clone(),
        &["reads-pom".to_string(), "hook-fires".to_string()],
        None,
    )
    .unwrap();
    assert_eq!(named[0].name, "hook-fires");
    assert_eq!(named.len(), 2);

    let none = select_cases(all.clone(), &["writes-notes".to_string()], Some("hook")).unwrap();
    assert!(none.is_empty());

    let err = select_cases(all, &["nope".to_string()], None).unwrap_err();
    assert!(matches!(err, HarnessError::UsageError(_)));
}
