//! Output formatting for lookup results.
//!
//! Supports plain value output and JSON records.

use anyhow::Result;
use serde::Serialize;

/// One lookup as reported by the CLI. `value` is left out when not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupRecord {
    pub key: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LookupRecord {
    pub fn new(key: &str, (value, found): (String, bool)) -> Self {
        Self {
            key: key.to_string(),
            found,
            value: found.then_some(value),
        }
    }
}

/// Renders the record as a single-line JSON object.
pub fn render_json(record: &LookupRecord) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Renders only the value, or an empty string when the key was not found.
pub fn render_plain(record: &LookupRecord) -> &str {
    record.value.as_deref().unwrap_or("")
}
