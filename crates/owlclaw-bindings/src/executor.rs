//! Executor trait implemented once per binding type.

use async_trait::async_trait;
use owlclaw_core::ValidationMode;
use serde_json::{Map, Value};

use crate::config::BindingConfig;
use crate::credentials::CredentialResolver;
use crate::error::BindingError;
use crate::result::ExecutionResult;

/// Protocol-specific strategy for one binding type.
#[async_trait]
pub trait BindingExecutor: Send + Sync {
    /// The `type` tag this executor handles.
    fn binding_type(&self) -> &'static str;

    /// Every problem with a raw declaration. Empty means valid.
    fn validate_config(&self, raw: &Value) -> Vec<String> {
        let declared = raw.get("type").and_then(Value::as_str);
        if declared.is_some_and(|t| t != self.binding_type()) {
            return vec![format!(
                "executor '{}' cannot run binding type '{}'",
                self.binding_type(),
                declared.unwrap_or_default()
            )];
        }
        BindingConfig::check(raw, ValidationMode::Strict).errors
    }

    /// Run one invocation.
    ///
    /// # Errors
    ///
    /// Returns a `BindingError` for anything that prevents a result.
    async fn execute(
        &self,
        config: &BindingConfig,
        parameters: &Map<String, Value>,
        resolver: &CredentialResolver,
    ) -> Result<ExecutionResult, BindingError>;
}

/// Error for a config handed to the wrong executor.
pub(crate) fn mismatched(expected: &str, config: &BindingConfig) -> BindingError {
    BindingError::Execution(format!(
        "executor '{expected}' cannot run binding type '{}'",
        config.binding_type()
    ))
}
