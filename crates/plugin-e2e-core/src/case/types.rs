use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::evaluation::AssertionKind;

/// One resolved test case: defaults applied, assertion keys validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub project: String,
    pub prompt: String,
    pub model: String,
    pub max_turns: u32,
    pub allowed_tools: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub assertions: BTreeMap<AssertionKind, Vec<String>>,
}

impl TestCase {
    /// Declared type, or `other` when the record has none.
    pub fn type_label(&self) -> &str {
        self.case_type.as_deref().unwrap_or("other")
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// A case record as written in the source, before defaults and validation.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    pub case_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Assertion keys plus anything unrecognised
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_json::Value>,
}

/// Encoding of a case source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    /// Pick the format from the file extension; anything but `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => SourceFormat::Yaml,
            _ => SourceFormat::Json,
        }
    }
}
