//! Report aggregation: one markdown document per run, grouped by case type.
//!
//! The report is rendered once, after every outcome is in, and replaces any previous file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::case::TestCase;
use crate::error::{HarnessError, Result};
use crate::evaluation::clip;

/// Final state of one executed case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub passed: bool,
    pub duration: Duration,
    /// Bounded message of the error that failed the case
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl CaseOutcome {
    pub fn pass(case: &TestCase, duration: Duration) -> Self {
        Self {
            name: case.name.clone(),
            case_type: case.case_type.clone(),
            description: case.description.clone(),
            passed: true,
            duration,
            failure: None,
        }
    }

    pub fn fail(case: &TestCase, duration: Duration, error: &HarnessError) -> Self {
        Self {
            passed: false,
            failure: Some(error.to_string()),
            ..Self::pass(case, duration)
        }
    }

    pub fn type_label(&self) -> &str {
        self.case_type.as_deref().unwrap_or("other")
    }

    /// Table status cell: `PASS` or `FAIL: <message>` with the message cut to `max_chars`.
    pub fn status(&self, max_chars: usize) -> String {
        if self.passed {
            return "PASS".to_string();
        }
        let message = self.failure.as_deref().unwrap_or("");
        let single_line = message.lines().last().unwrap_or("").trim();
        format!("FAIL: {}", table_cell(clip(single_line, max_chars)))
    }
}

/// Outcomes of one case type, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub case_type: String,
    pub outcomes: Vec<CaseOutcome>,
}

impl ReportGroup {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Groups in order of each type's first appearance
    pub groups: Vec<ReportGroup>,
    pub passed: usize,
    pub total: usize,
    /// Sum of case durations
    pub duration: Duration,
    status_chars: usize,
}

impl Report {
    pub fn aggregate(outcomes: Vec<CaseOutcome>, status_chars: usize) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed).count();
        let total = outcomes.len();
        let duration = outcomes.iter().map(|o| o.duration).sum();

        let mut groups: Vec<ReportGroup> = Vec::new();
        for outcome in outcomes {
            let label = outcome.type_label().to_string();
            match groups.iter_mut().find(|g| g.case_type == label) {
                Some(group) => group.outcomes.push(outcome),
                None => groups.push(ReportGroup {
                    case_type: label,
                    outcomes: vec![outcome],
                }),
            }
        }

        Self {
            groups,
            passed,
            total,
            duration,
            status_chars,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut lines = vec![
            "# Test Report".to_string(),
            String::new(),
            format!("**Date:** {}", now.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("**Result:** {}/{} passed", self.passed, self.total),
            format!("**Duration:** {:.1}s", self.duration.as_secs_f64()),
        ];

        for group in &self.groups {
            lines.push(String::new());
            lines.push(format!(
                "## {} ({}/{})",
                group.case_type,
                group.passed(),
                group.outcomes.len()
            ));
            lines.push(String::new());
            lines.push("| Test | Description | Status |".to_string());
            lines.push("|------|-------------|--------|".to_string());
            for outcome in &group.outcomes {
                lines.push(format!(
                    "| {} | {} | {} |",
                    outcome.name,
                    table_cell(outcome.description.as_deref().unwrap_or("")),
                    outcome.status(self.status_chars)
                ));
            }
        }

        lines.push(String::new());
        lines.join("\n")
    }

    /// Render and overwrite `path`.
    pub fn write(&self, path: &Path, now: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(now))?;
        tracing::debug!(path = %path.display(), passed = self.passed, total = self.total, "report written");
        Ok(())
    }
}

fn table_cell(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outcome(name: &str, case_type: Option<&str>, failure: Option<&str>, secs: f64) -> CaseOutcome {
        CaseOutcome {
            name: name.to_string(),
            case_type: case_type.map(str::to_string),
            description: Some(format!("{} description", name)),
            passed: failure.is_none(),
            duration: Duration::from_secs_f64(secs),
            failure: failure.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_render_groups_and_totals() {
        let report = Report::aggregate(
            vec![
                outcome("a", Some("x"), None, 1.2),
                outcome("b", Some("x"), Some("Expected file not found: notes.txt"), 2.0),
                outcome("c", Some("y"), None, 0.5),
            ],
            80,
        );

        assert_eq!(report.passed, 2);
        assert_eq!(report.total, 3);
        assert!(!report.all_passed());

        let expected = "\
# Test Report

**Date:** 2026-03-14 09:26:53 UTC
**Result:** 2/3 passed
**Duration:** 3.7s

## x (1/2)

| Test | Description | Status |
|------|-------------|--------|
| a | a description | PASS |
| b | b description | FAIL: Expected file not found: notes.txt |

## y (1/1)

| Test | Description | Status |
|------|-------------|--------|
| c | c description | PASS |
";
        assert_eq!(report.render(now()), expected);
    }

    #[test]
    fn test_missing_type_and_description() {
        let mut untyped = outcome("solo", None, None, 0.0);
        untyped.description = None;
        let report = Report::aggregate(vec![untyped], 80);

        let rendered = report.render(now());
        assert!(rendered.contains("## other (1/1)"));
        assert!(rendered.contains("| solo |  | PASS |"));
    }

    #[test]
    fn test_status_bounded_and_table_safe() {
        let long = format!("first line\nNo hook output | {}", "z".repeat(200));
        let failed = outcome("f", Some("hook"), Some(&long), 0.1);

        let status = failed.status(80);
        assert!(status.starts_with("FAIL: No hook output \\| zzz"));
        assert!(!status.contains('\n'));
        // 80 chars of message plus the escape backslash.
        assert_eq!(status.trim_start_matches("FAIL: ").chars().count(), 81);
    }

    #[test]
    fn test_empty_run() {
        let report = Report::aggregate(Vec::new(), 80);
        assert!(report.all_passed());
        assert_eq!(
            report.render(now()),
            "# Test Report\n\n**Date:** 2026-03-14 09:26:53 UTC\n**Result:** 0/0 passed\n**Duration:** 0.0s\n"
        );
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/TEST_REPORT.md");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale contents").unwrap();

        Report::aggregate(vec![outcome("a", Some("x"), None, 1.0)], 80)
            .write(&path, now())
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Test Report\n"));
        assert!(!written.contains("stale"));
    }
}
