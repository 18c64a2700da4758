//! Tool parameter validation.
//!
//! Arguments arriving from the agent loop are checked against the declared
//! parameter schema before any binding is dispatched.

use serde_json::Value;
use thiserror::Error;

/// Validation error types.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Input exceeds maximum allowed length.
    #[error("Input exceeds maximum length ({max} bytes, got {actual})")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Input failed schema validation.
    #[error("Input failed schema validation: {0}")]
    SchemaViolation(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Size limits per input type.
pub mod limits {
    /// Maximum tool parameters size (1MB).
    pub const MAX_TOOL_PARAMS_SIZE: usize = 1024 * 1024;

    /// Maximum binding manifest size (1MB).
    pub const MAX_MANIFEST_SIZE: usize = 1024 * 1024;

    /// Maximum JSON nesting depth.
    pub const MAX_JSON_DEPTH: usize = 32;
}

/// Validate tool parameters against a JSON schema.
///
/// Supports the subset of JSON Schema used by binding declarations:
/// `type`, `required`, and per-property `type`.
///
/// Every other keyword is ignored. A schema that relies on `enum`, `items`,
/// `minimum`/`maximum`, `pattern` or `additionalProperties` is not enforced
/// here, and an executor sees whatever values the caller sent.
///
/// # Errors
///
/// Returns `ValidationError::SchemaViolation` if validation fails.
pub fn validate_tool_params(params: &Value, schema: &Value) -> Result<(), ValidationError> {
    let size = serde_json::to_string(params)?.len();
    if size > limits::MAX_TOOL_PARAMS_SIZE {
        return Err(ValidationError::TooLong {
            max: limits::MAX_TOOL_PARAMS_SIZE,
            actual: size,
        });
    }

    check_json_depth(params, 0, limits::MAX_JSON_DEPTH)?;

    validate_json_structure(params, schema, "arguments")
}

/// Check JSON nesting depth to prevent stack overflow.
///
/// # Errors
///
/// Returns `ValidationError::SchemaViolation` when nesting exceeds `max`.
pub fn check_json_depth(value: &Value, depth: usize, max: usize) -> Result<(), ValidationError> {
    if depth > max {
        return Err(ValidationError::SchemaViolation(format!(
            "JSON nesting depth exceeds maximum ({max})"
        )));
    }

    match value {
        Value::Array(arr) => {
            for item in arr {
                check_json_depth(item, depth + 1, max)?;
            }
        }
        Value::Object(obj) => {
            for item in obj.values() {
                check_json_depth(item, depth + 1, max)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn validate_json_structure(params: &Value, schema: &Value, at: &str) -> Result<(), ValidationError> {
    let schema_type = schema.get("type").and_then(Value::as_str);

    match schema_type {
        Some("object") => {
            let Some(obj) = params.as_object() else {
                return Err(violation(at, "expected object"));
            };

            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for field in required.iter().filter_map(Value::as_str) {
                    if !obj.contains_key(field) {
                        return Err(ValidationError::SchemaViolation(format!(
                            "Missing required field: {field}"
                        )));
                    }
                }
            }

            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (name, property_schema) in properties {
                    // Explicit nulls are treated like absent optional fields
                    if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
                        validate_json_structure(value, property_schema, name)?;
                    }
                }
            }
        }
        Some("array") if !params.is_array() => return Err(violation(at, "expected array")),
        Some("string") if !params.is_string() => return Err(violation(at, "expected string")),
        Some("integer") if !(params.is_i64() || params.is_u64()) => {
            return Err(violation(at, "expected integer"));
        }
        Some("number") if !params.is_number() => return Err(violation(at, "expected number")),
        Some("boolean") if !params.is_boolean() => return Err(violation(at, "expected boolean")),
        _ => {}
    }

    Ok(())
}

fn violation(at: &str, message: &str) -> ValidationError {
    ValidationError::SchemaViolation(format!("{at}: {message}"))
}
