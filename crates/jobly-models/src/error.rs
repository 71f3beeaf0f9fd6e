//! Error bodies returned by the API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error payload. The backend uses `message`, `error` or `detail` for the
/// human-readable part and may return per-field validation errors either
/// under `errors` or at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl ApiErrorBody {
    /// Parse an error body, returning `None` for non-JSON payloads.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body).ok()
    }

    /// Best human-readable summary of the error.
    pub fn summary(&self) -> Option<String> {
        if let Some(msg) = self
            .message
            .as_ref()
            .or(self.error.as_ref())
            .or(self.detail.as_ref())
        {
            return Some(msg.clone());
        }

        let field_errors = self.field_errors();
        if field_errors.is_empty() {
            return None;
        }

        Some(
            field_errors
                .iter()
                .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Per-field validation messages from either location.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut out = self.errors.clone().unwrap_or_default();
        for (field, value) in &self.fields {
            let msgs: Vec<String> = match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                Value::String(s) => vec![s.clone()],
                _ => continue,
            };
            if !msgs.is_empty() {
                out.entry(field.clone()).or_default().extend(msgs);
            }
        }
        out
    }
}
