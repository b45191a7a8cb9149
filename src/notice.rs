//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `load_notices`.
//! Role: Shared contract helper for CLI diagnostics (account-load issues).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

use crate::core::accounts::LoadReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// One `account_load` notice per issue recorded while loading accounts.
pub fn load_notices(report: &LoadReport, cmd: &str, time: &str) -> Vec<Notice> {
    report
        .issues
        .iter()
        .map(|issue| {
            let mut details = Map::new();
            if let Some(source) = &report.source {
                details.insert("source".to_string(), json!(source.display().to_string()));
            }
            if let Some(line) = issue.line {
                details.insert("line".to_string(), json!(line));
            }
            details.insert("rows_loaded".to_string(), json!(report.rows_loaded));
            Notice {
                kind: "account_load".to_string(),
                time: time.to_string(),
                cmd: cmd.to_string(),
                message: issue.message.clone(),
                details,
            }
        })
        .collect()
}
