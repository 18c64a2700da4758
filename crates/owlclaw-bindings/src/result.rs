//! Uniform execution result.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome label of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    /// The call succeeded.
    Success,
    /// The remote system reported a failure.
    Error,
    /// A label taken from `response_mapping.status_codes`.
    Label(String),
}

impl ResultStatus {
    /// Label as written in results.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Label(label) => label,
        }
    }
}

impl From<String> for ResultStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Label(value),
        }
    }
}

impl From<&str> for ResultStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Label(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Result of one binding execution, serialized as a flat mapping.
///
/// Protocol extras (`_method`, `_url`, `row_count`, ...) live in `extras`
/// and are flattened next to the fixed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome label.
    pub status: ResultStatus,

    /// Payload on success, or the raw body on an unmapped failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Protocol status code, when the protocol has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Set when a side effect was intercepted instead of performed.
    #[serde(rename = "_shadow", default, skip_serializing_if = "is_false")]
    pub shadow: bool,

    /// Protocol-specific fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl ExecutionResult {
    /// A result with the given status and nothing else.
    #[must_use]
    pub fn new(status: impl Into<ResultStatus>) -> Self {
        Self {
            status: status.into(),
            data: None,
            error: None,
            status_code: None,
            shadow: false,
            extras: Map::new(),
        }
    }

    /// A successful result carrying `data`.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self::new(ResultStatus::Success).with_data(data)
    }

    /// A failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        let mut result = Self::new(ResultStatus::Error);
        result.error = Some(error.into());
        result
    }

    /// An intercepted side effect.
    #[must_use]
    pub fn shadow() -> Self {
        let mut result = Self::new(ResultStatus::Success);
        result.shadow = true;
        result
    }

    /// Set `data`.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the protocol status code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add a protocol extra.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// A protocol extra by key.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Whether the status is `error`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }

    /// The flat result mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("status".into(), Value::String(self.status.to_string()));
        if let Some(data) = &self.data {
            map.insert("data".into(), data.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".into(), Value::String(error.clone()));
        }
        if let Some(code) = self.status_code {
            map.insert("status_code".into(), Value::from(code));
        }
        if self.shadow {
            map.insert("_shadow".into(), Value::Bool(true));
        }
        for (key, value) in &self.extras {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_mapping() {
        let result = ExecutionResult::success(json!(10)).with_status_code(200);
        assert_eq!(
            result.to_value(),
            json!({"status": "success", "data": 10, "status_code": 200})
        );
        assert_eq!(serde_json::to_value(&result).unwrap(), result.to_value());
    }

    #[test]
    fn test_shadow_extras_flattened() {
        let result = ExecutionResult::shadow()
            .with_extra("_method", "POST")
            .with_extra("_headers", json!(["Authorization"]));
        let value = result.to_value();
        assert_eq!(value["_shadow"], json!(true));
        assert_eq!(value["_method"], json!("POST"));
        assert_eq!(value["_headers"], json!(["Authorization"]));
    }

    #[test]
    fn test_status_labels() {
        let result: ExecutionResult =
            serde_json::from_value(json!({"status": "not_found", "status_code": 404, "row_count": 0}))
                .unwrap();
        assert_eq!(result.status, ResultStatus::Label("not_found".into()));
        assert!(!result.is_error());
        assert!(!result.shadow);
        assert_eq!(result.extra("row_count"), Some(&json!(0)));

        assert!(ExecutionResult::failure("HTTP 500").is_error());
        assert_eq!(ResultStatus::from("success"), ResultStatus::Success);
    }
}
