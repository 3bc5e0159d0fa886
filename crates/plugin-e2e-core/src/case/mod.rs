//! Case registry: loading and normalizing declarative test cases.
//!
//! A case source is an ordered list of records (JSON array or YAML sequence). Loading
//! applies the default table to absent keys only, validates every record, and rejects
//! duplicate names and unknown assertion keys before anything runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use plugin_e2e_core::case;
//! use plugin_e2e_core::config::CaseDefaults;
//!
//! let cases = case::load("tests/tests.json", &CaseDefaults::default()).unwrap();
//! for c in &cases {
//!     println!("{} -> {}", c.name, c.project);
//! }
//! ```

pub mod types;

pub use types::{SourceFormat, TestCase};

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::CaseDefaults;
use crate::error::{HarnessError, Result};
use crate::evaluation::AssertionKind;
use types::RawCase;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("case name pattern"));

/// Load and resolve every case declared in `path`, in source order.
pub fn load<P: AsRef<Path>>(path: P, defaults: &CaseDefaults) -> Result<Vec<TestCase>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| HarnessError::load(path, e))?;
    let raw = parse_records(&content, SourceFormat::from_path(path))
        .map_err(|reason| HarnessError::load(path, reason))?;
    let cases = resolve_all(raw, defaults)?;
    tracing::debug!(path = %path.display(), count = cases.len(), "loaded test cases");
    Ok(cases)
}

/// Resolve cases from an in-memory source.
pub fn parse(content: &str, format: SourceFormat, defaults: &CaseDefaults) -> Result<Vec<TestCase>> {
    let raw = parse_records(content, format)
        .map_err(|reason| HarnessError::load("<inline>", reason))?;
    resolve_all(raw, defaults)
}

fn parse_records(content: &str, format: SourceFormat) -> std::result::Result<Vec<RawCase>, String> {
    match format {
        SourceFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        SourceFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    }
}

fn resolve_all(raw: Vec<RawCase>, defaults: &CaseDefaults) -> Result<Vec<TestCase>> {
    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(raw.len());

    for (index, record) in raw.into_iter().enumerate() {
        let case = resolve(record, index, defaults)?;
        if !seen.insert(case.name.clone()) {
            return Err(HarnessError::DuplicateCase { name: case.name });
        }
        cases.push(case);
    }

    Ok(cases)
}

fn resolve(raw: RawCase, index: usize, defaults: &CaseDefaults) -> Result<TestCase> {
    let name = match raw.name {
        Some(name) => name,
        None => {
            return Err(HarnessError::invalid_case(
                &format!("#{}", index),
                "missing required field 'name'",
            ))
        }
    };
    if !NAME_PATTERN.is_match(&name) {
        return Err(HarnessError::invalid_case(
            &name,
            "name must start with a letter or digit and contain only letters, digits, '.', '_' or '-'",
        ));
    }

    let project = require(&name, "project", raw.project)?;
    if !is_single_component(&project) {
        return Err(HarnessError::invalid_case(
            &name,
            format!("project must be a single directory name, got '{}'", project),
        ));
    }
    let prompt = require(&name, "prompt", raw.prompt)?;
    let assertions = resolve_assertions(&name, raw.rest)?;
    let max_turns = raw.max_turns.unwrap_or(defaults.max_turns);
    if max_turns == 0 {
        return Err(HarnessError::invalid_case(&name, "max_turns must be at least 1"));
    }

    Ok(TestCase {
        name,
        project,
        prompt,
        model: raw.model.unwrap_or_else(|| defaults.model.clone()),
        max_turns,
        allowed_tools: raw
            .allowed_tools
            .unwrap_or_else(|| defaults.allowed_tools.clone()),
        case_type: raw.case_type,
        description: raw.description,
        assertions,
    })
}

fn require(case: &str, field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(HarnessError::invalid_case(
            case,
            format!("field '{}' must not be empty", field),
        )),
        None => Err(HarnessError::invalid_case(
            case,
            format!("missing required field '{}'", field),
        )),
    }
}

fn resolve_assertions(
    case: &str,
    rest: BTreeMap<String, serde_json::Value>,
) -> Result<BTreeMap<AssertionKind, Vec<String>>> {
    let mut assertions = BTreeMap::new();

    for (key, value) in rest {
        let kind = match AssertionKind::from_key(&key) {
            Some(kind) => kind,
            None if key.starts_with("assert_") => {
                return Err(HarnessError::UnknownAssertion {
                    case: case.to_string(),
                    key,
                })
            }
            None => {
                return Err(HarnessError::invalid_case(
                    case,
                    format!("unknown field '{}'", key),
                ))
            }
        };

        let expected = string_list(case, &key, value)?;
        if kind == AssertionKind::FileExists {
            if let Some(bad) = expected.iter().find(|p| !is_contained_path(p)) {
                return Err(HarnessError::invalid_case(
                    case,
                    format!("{} path '{}' must be relative to the sandbox", key, bad),
                ));
            }
        }
        assertions.insert(kind, expected);
    }

    Ok(assertions)
}

/// A string or a list of strings.
fn string_list(case: &str, key: &str, value: serde_json::Value) -> Result<Vec<String>> {
    match value {
        serde_json::Value::String(s) => Ok(vec![s]),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(HarnessError::invalid_case(
                    case,
                    format!("{} entries must be strings, got {}", key, other),
                )),
            })
            .collect(),
        other => Err(HarnessError::invalid_case(
            case,
            format!("{} must be a string or list of strings, got {}", key, other),
        )),
    }
}

fn is_single_component(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn is_contained_path(value: &str) -> bool {
    let path = Path::new(value);
    !value.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
