//! Assertion engine: evaluates a case's declared predicates against its sandbox and transcript.
//!
//! Every declared kind is evaluated, even after a failure, so the outcome carries complete
//! diagnostics. Kinds a case does not declare are not checked at all.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::case::TestCase;
use crate::config::Limits;
use crate::error::{HarnessError, Result};
use crate::transcript::{self, Transcript};

/// The predicate kinds a case may declare, keyed in the case source as `assert_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AssertionKind {
    #[serde(rename = "assert_file_exists")]
    FileExists,
    #[serde(rename = "assert_tool_read")]
    ToolRead,
    #[serde(rename = "assert_tool_used")]
    ToolUsed,
    #[serde(rename = "assert_hook_output")]
    HookOutput,
    #[serde(rename = "assert_skill_used")]
    SkillUsed,
    #[serde(rename = "assert_response_contains")]
    ResponseContains,
}

impl AssertionKind {
    pub const ALL: [AssertionKind; 6] = [
        AssertionKind::FileExists,
        AssertionKind::ToolRead,
        AssertionKind::ToolUsed,
        AssertionKind::HookOutput,
        AssertionKind::SkillUsed,
        AssertionKind::ResponseContains,
    ];

    /// Key used in case sources.
    pub fn key(&self) -> &'static str {
        match self {
            AssertionKind::FileExists => "assert_file_exists",
            AssertionKind::ToolRead => "assert_tool_read",
            AssertionKind::ToolUsed => "assert_tool_used",
            AssertionKind::HookOutput => "assert_hook_output",
            AssertionKind::SkillUsed => "assert_skill_used",
            AssertionKind::ResponseContains => "assert_response_contains",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssertionKind::FileExists => "file-exists",
            AssertionKind::ToolRead => "tool-read",
            AssertionKind::ToolUsed => "tool-used",
            AssertionKind::HookOutput => "hook-output",
            AssertionKind::SkillUsed => "skill-used",
            AssertionKind::ResponseContains => "response-contains",
        };
        f.write_str(label)
    }
}

/// Everything an evaluator may look at once the session has ended.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub sandbox_root: &'a Path,
    pub transcript: &'a Transcript,
    pub limits: &'a Limits,
}

/// Outcome of one declared predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub kind: AssertionKind,
    pub passed: bool,
    /// Expected values that were not observed
    pub unmet: Vec<String>,
    /// Message for the first unmet value, bounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

pub trait AssertionEvaluator {
    fn evaluate(&self, expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult;
}

impl AssertionEvaluator for AssertionKind {
    fn evaluate(&self, expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
        match self {
            AssertionKind::FileExists => eval_file_exists(expected, ctx),
            AssertionKind::ToolRead => eval_tool_read(expected, ctx),
            AssertionKind::ToolUsed => eval_tool_used(expected, ctx),
            AssertionKind::HookOutput => eval_hook_output(expected, ctx),
            AssertionKind::SkillUsed => eval_skill_used(expected, ctx),
            AssertionKind::ResponseContains => eval_response_contains(expected, ctx),
        }
    }
}

fn eval_file_exists(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let unmet = unmet_by(expected, |path| ctx.sandbox_root.join(path).exists());
    conclude(AssertionKind::FileExists, unmet, ctx, |path| {
        format!("Expected file not found: {}", path)
    })
}

fn eval_tool_read(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let reads = transcript::read_paths(ctx.transcript);
    let unmet = unmet_by(expected, |kw| reads.iter().any(|p| p.contains(kw)));
    conclude(AssertionKind::ToolRead, unmet, ctx, |kw| {
        format!("Agent never Read a file matching '{}'. Reads: {:?}", kw, reads)
    })
}

fn eval_tool_used(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let used = transcript::tool_names_used(ctx.transcript);
    let unmet = unmet_by(expected, |tool| used.contains(tool));
    conclude(AssertionKind::ToolUsed, unmet, ctx, |tool| {
        format!("Agent never used tool '{}'. Used: {:?}", tool, used)
    })
}

fn eval_hook_output(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let output = transcript::hook_outputs(ctx.transcript, ctx.limits.max_projection_bytes);
    let unmet = unmet_by(expected, |kw| output.contains(&kw.to_lowercase()));
    conclude(AssertionKind::HookOutput, unmet, ctx, |kw| {
        format!(
            "No hook output matching '{}'. Output: {}",
            kw,
            clip(&output, ctx.limits.diagnostic_chars)
        )
    })
}

fn eval_skill_used(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let calls = transcript::skill_invocations(ctx.transcript);
    let unmet = unmet_by(expected, |kw| calls.iter().any(|s| s.contains(kw)));
    conclude(AssertionKind::SkillUsed, unmet, ctx, |kw| {
        format!(
            "Agent never invoked Skill matching '{}'. Skill calls: {:?}",
            kw, calls
        )
    })
}

fn eval_response_contains(expected: &[String], ctx: &EvalContext<'_>) -> AssertionResult {
    let text = transcript::response_text(ctx.transcript, ctx.limits.max_projection_bytes);
    let unmet = unmet_by(expected, |kw| text.contains(&kw.to_lowercase()));
    conclude(AssertionKind::ResponseContains, unmet, ctx, |kw| {
        format!(
            "Response does not contain '{}'. Text: {}",
            kw,
            clip(&text, ctx.limits.diagnostic_chars)
        )
    })
}

fn unmet_by(expected: &[String], mut observed: impl FnMut(&str) -> bool) -> Vec<String> {
    expected
        .iter()
        .filter(|value| !observed(value.as_str()))
        .cloned()
        .collect()
}

fn conclude(
    kind: AssertionKind,
    unmet: Vec<String>,
    ctx: &EvalContext<'_>,
    describe: impl FnOnce(&str) -> String,
) -> AssertionResult {
    let diagnostic = unmet
        .first()
        .map(|first| clip(&describe(first), ctx.limits.diagnostic_chars).to_string());
    AssertionResult {
        kind,
        passed: unmet.is_empty(),
        unmet,
        diagnostic,
    }
}

/// First `max_chars` characters of `s`.
pub fn clip(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Results of every predicate a case declared, in declaration-key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub results: Vec<AssertionResult>,
}

impl Verdict {
    /// True when every declared predicate held (vacuously true for none).
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn first_failure(&self) -> Option<&AssertionResult> {
        self.results.iter().find(|r| !r.passed)
    }

    /// `Ok` when passed, otherwise the first failure's diagnostic.
    pub fn into_result(self) -> Result<()> {
        match self.results.into_iter().find(|r| !r.passed) {
            None => Ok(()),
            Some(failed) => Err(HarnessError::AssertionFailed {
                kind: failed.kind,
                diagnostic: failed
                    .diagnostic
                    .unwrap_or_else(|| format!("{} assertion failed", failed.kind)),
            }),
        }
    }
}

/// Evaluate every assertion declared on `case`.
pub fn evaluate(case: &TestCase, ctx: &EvalContext<'_>) -> Verdict {
    let results: Vec<AssertionResult> = case
        .assertions
        .iter()
        .map(|(kind, expected)| kind.evaluate(expected, ctx))
        .collect();

    for result in results.iter().filter(|r| !r.passed) {
        tracing::debug!(
            case = %case.name,
            kind = %result.kind,
            unmet = ?result.unmet,
            "assertion failed"
        );
    }

    Verdict { results }
}
