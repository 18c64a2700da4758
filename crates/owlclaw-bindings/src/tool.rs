//! Binding-backed tools.
//!
//! A [`BindingTool`] is what the agent loop calls. Each invocation walks
//! VALIDATING → RESOLVING → DISPATCHING → EXECUTING → COMPLETED or FAILED,
//! and produces exactly one invocation record.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use owlclaw_core::{ValidationMode, validate_tool_params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::config::BindingConfig;
use crate::credentials::CredentialResolver;
use crate::error::{BindingError, ConfigurationError, ToolError};
use crate::recorder::{InvocationRecord, InvocationStatus, Recorder};
use crate::registry::ExecutorRegistry;
use crate::result::ExecutionResult;

/// Default cap on recorded summaries, in characters.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "...[truncated]";

/// Tool description handed to the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema for the arguments.
    pub input_schema: Value,
}

/// Invocation lifecycle stage, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Config and arguments are being checked.
    Validating,
    /// Credential references are being checked.
    Resolving,
    /// The executor is being looked up.
    Dispatching,
    /// The executor is running.
    Executing,
    /// A shadow-mode side effect is being reported instead of performed.
    RecordingOnly,
    /// Finished with a result.
    Completed,
    /// Finished with an error.
    Failed,
}

impl InvocationState {
    /// Upper-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "VALIDATING",
            Self::Resolving => "RESOLVING",
            Self::Dispatching => "DISPATCHING",
            Self::Executing => "EXECUTING",
            Self::RecordingOnly => "RECORDING_ONLY",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named tool backed by one binding declaration.
pub struct BindingTool {
    name: String,
    description: String,
    parameters_schema: Value,
    config: Arc<BindingConfig>,
    registry: Arc<ExecutorRegistry>,
    resolver: Arc<CredentialResolver>,
    recorder: Option<Arc<dyn Recorder>>,
    summary_max_chars: usize,
    validation: ValidationMode,
}

impl BindingTool {
    /// Create a tool with no recorder and default limits.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: Value,
        config: Arc<BindingConfig>,
        registry: Arc<ExecutorRegistry>,
        resolver: Arc<CredentialResolver>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
            config,
            registry,
            resolver,
            recorder: None,
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
            validation: ValidationMode::Strict,
        }
    }

    /// Send one record per invocation to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Cap recorded summaries at `max_chars` characters.
    #[must_use]
    pub const fn with_summary_max_chars(mut self, max_chars: usize) -> Self {
        self.summary_max_chars = max_chars;
        self
    }

    /// Treat secret-heuristic findings per `mode` when re-checking the config.
    #[must_use]
    pub const fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The binding this tool runs.
    #[must_use]
    pub fn config(&self) -> &Arc<BindingConfig> {
        &self.config
    }

    /// Argument schema.
    #[must_use]
    pub const fn parameters_schema(&self) -> &Value {
        &self.parameters_schema
    }

    /// Definition for the agent loop.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters_schema.clone(),
        }
    }

    /// Run the binding with `args`.
    ///
    /// # Errors
    ///
    /// Returns a `ToolError` naming this tool when any stage fails.
    pub async fn invoke(&self, args: Value) -> Result<ExecutionResult, ToolError> {
        let started = Instant::now();
        let outcome = self.run(&args).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(result) => self.transition(InvocationState::Completed, Some(result.status.as_str())),
            Err(e) => self.transition(InvocationState::Failed, Some(e.kind())),
        }

        self.record(&args, &outcome, elapsed_ms).await;

        outcome.map_err(|source| ToolError {
            tool: self.name.clone(),
            source,
        })
    }

    /// Run the binding and return the flat result mapping.
    ///
    /// # Errors
    ///
    /// Same as [`BindingTool::invoke`].
    pub async fn call(&self, args: Value) -> Result<Value, ToolError> {
        self.invoke(args).await.map(|result| result.to_value())
    }

    async fn run(&self, args: &Value) -> Result<ExecutionResult, BindingError> {
        self.transition(InvocationState::Validating, None);
        let report = self.config.report(self.validation);
        if !report.is_valid() {
            return Err(ConfigurationError {
                errors: report.errors,
            }
            .into());
        }
        let parameters = arguments(args)?;
        validate_tool_params(&Value::Object(parameters.clone()), &self.parameters_schema)
            .map_err(|e| BindingError::InvalidParameters(e.to_string()))?;

        self.transition(InvocationState::Resolving, None);
        let references = self.config.credential_references();
        self.resolver
            .ensure_resolvable(references.iter().map(String::as_str))?;

        self.transition(InvocationState::Dispatching, Some(self.config.binding_type()));
        let executor = self.registry.get(self.config.binding_type())?;

        if self.config.is_shadow() && self.config.is_mutating() {
            self.transition(InvocationState::RecordingOnly, None);
        } else {
            self.transition(InvocationState::Executing, None);
        }
        executor
            .execute(&self.config, &parameters, &self.resolver)
            .await
    }

    fn transition(&self, state: InvocationState, detail: Option<&str>) {
        debug!(
            tool = %self.name,
            state = %state,
            detail = detail.unwrap_or_default(),
            "Binding tool state"
        );
    }

    async fn record(
        &self,
        args: &Value,
        outcome: &Result<ExecutionResult, BindingError>,
        elapsed_ms: u64,
    ) {
        let Some(recorder) = &self.recorder else {
            return;
        };

        let (result_summary, result_status, status, error_message) = match outcome {
            Ok(result) => {
                let status = if result.is_error() {
                    InvocationStatus::Error
                } else {
                    InvocationStatus::Success
                };
                let error_message = result
                    .error
                    .as_deref()
                    .filter(|_| result.is_error())
                    .map(|e| truncate(e, self.summary_max_chars));
                (
                    summarize(&result.to_value(), self.summary_max_chars),
                    Some(result.status.to_string()),
                    status,
                    error_message,
                )
            }
            Err(e) => {
                let message = truncate(&e.to_string(), self.summary_max_chars);
                (message.clone(), None, InvocationStatus::Error, Some(message))
            }
        };

        let record = InvocationRecord {
            tool_name: self.name.clone(),
            binding_type: self.config.binding_type().to_string(),
            mode: self.config.mode,
            parameters: args.clone(),
            result_summary,
            result_status,
            elapsed_ms,
            status,
            error_message,
            timestamp: Utc::now(),
        };

        if let Err(e) = recorder.record(record).await {
            error!(tool = %self.name, error = %e, "Failed to record binding invocation");
        }
    }
}

impl fmt::Debug for BindingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTool")
            .field("name", &self.name)
            .field("binding_type", &self.config.binding_type())
            .field("mode", &self.config.mode)
            .finish_non_exhaustive()
    }
}

/// Arguments as a map. `null` counts as no arguments.
fn arguments(args: &Value) -> Result<Map<String, Value>, BindingError> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(BindingError::InvalidParameters(
            "arguments must be a JSON object".to_string(),
        )),
    }
}

/// Compact JSON of `value`, truncated to `max_chars`.
#[must_use]
pub fn summarize(value: &Value, max_chars: usize) -> String {
    truncate(&value.to_string(), max_chars)
}

/// Keep at most `max_chars` characters, appending a marker when cut.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MapSource;
    use crate::executor::BindingExecutor;
    use crate::recorder::{MemoryRecorder, RecorderError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoExecutor {
        calls: Mutex<Vec<Map<String, Value>>>,
    }

    #[async_trait]
    impl BindingExecutor for EchoExecutor {
        fn binding_type(&self) -> &'static str {
            "http"
        }

        async fn execute(
            &self,
            config: &BindingConfig,
            parameters: &Map<String, Value>,
            _resolver: &CredentialResolver,
        ) -> Result<ExecutionResult, BindingError> {
            self.calls.lock().unwrap().push(parameters.clone());
            if config.is_shadow() && config.is_mutating() {
                return Ok(ExecutionResult::shadow());
            }
            match parameters.get("fail").and_then(Value::as_str) {
                Some("transport") => Err(BindingError::Transport("connection reset".into())),
                Some("remote") => Ok(ExecutionResult::failure("HTTP 503")),
                _ => Ok(ExecutionResult::success(Value::Object(parameters.clone()))),
            }
        }
    }

    struct FailingRecorder;

    #[async_trait]
    impl Recorder for FailingRecorder {
        async fn record(&self, _record: InvocationRecord) -> Result<(), RecorderError> {
            Err(RecorderError("disk full".into()))
        }
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {"id": {"type": "string"}, "fail": {"type": "string"}},
            "required": ["id"]
        })
    }

    fn config(raw: Value) -> Arc<BindingConfig> {
        Arc::new(BindingConfig::parse(&raw).unwrap())
    }

    fn get_config() -> Arc<BindingConfig> {
        config(json!({
            "type": "http",
            "url": "https://api.example.com/orders/{id}",
            "headers": {"Authorization": "Bearer ${API_TOKEN}"}
        }))
    }

    struct Fixture {
        executor: Arc<EchoExecutor>,
        recorder: Arc<MemoryRecorder>,
        registry: Arc<ExecutorRegistry>,
        resolver: Arc<CredentialResolver>,
    }

    fn fixture() -> Fixture {
        let executor = Arc::new(EchoExecutor::default());
        let mut registry = ExecutorRegistry::new();
        registry.register(executor.clone());
        Fixture {
            executor,
            recorder: Arc::new(MemoryRecorder::new()),
            registry: Arc::new(registry),
            resolver: Arc::new(
                CredentialResolver::new()
                    .with_environment(MapSource::new().with("API_TOKEN", "abc")),
            ),
        }
    }

    fn tool(f: &Fixture, config: Arc<BindingConfig>) -> BindingTool {
        BindingTool::new(
            "get_order",
            "Fetch one order",
            schema(),
            config,
            f.registry.clone(),
            f.resolver.clone(),
        )
        .with_recorder(f.recorder.clone())
    }

    #[tokio::test]
    async fn test_success_records_once() {
        let f = fixture();
        let result = tool(&f, get_config())
            .invoke(json!({"id": "42"}))
            .await
            .unwrap();
        assert_eq!(result.data, Some(json!({"id": "42"})));

        let records = f.recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tool_name, "get_order");
        assert_eq!(records[0].binding_type, "http");
        assert_eq!(records[0].status, InvocationStatus::Success);
        assert_eq!(records[0].result_status.as_deref(), Some("success"));
        assert_eq!(records[0].parameters, json!({"id": "42"}));
        assert!(records[0].error_message.is_none());
    }

    #[tokio::test]
    async fn test_failure_records_once_and_names_tool() {
        let f = fixture();
        let err = tool(&f, get_config())
            .invoke(json!({"id": "42", "fail": "transport"}))
            .await
            .unwrap_err();
        assert_eq!(err.tool, "get_order");
        assert!(matches!(err.source, BindingError::Transport(_)));

        let records = f.recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvocationStatus::Error);
        assert!(
            records[0]
                .error_message
                .as_deref()
                .unwrap()
                .contains("connection reset")
        );
    }

    #[tokio::test]
    async fn test_error_result_is_recorded_as_error() {
        let f = fixture();
        let result = tool(&f, get_config())
            .invoke(json!({"id": "1", "fail": "remote"}))
            .await
            .unwrap();
        assert!(result.is_error());
        let records = f.recorder.records();
        assert_eq!(records[0].status, InvocationStatus::Error);
        assert_eq!(records[0].error_message.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_executor() {
        let f = fixture();
        let err = tool(&f, get_config()).invoke(json!({"id": 42})).await.unwrap_err();
        assert!(matches!(err.source, BindingError::InvalidParameters(_)));

        let err = tool(&f, get_config()).invoke(json!(["x"])).await.unwrap_err();
        assert!(matches!(err.source, BindingError::InvalidParameters(_)));

        assert!(f.executor.calls.lock().unwrap().is_empty());
        assert_eq!(f.recorder.len(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_credentials_fail_before_dispatch() {
        let mut f = fixture();
        f.resolver = Arc::new(CredentialResolver::new().with_environment(MapSource::new()));
        let err = tool(&f, get_config()).invoke(json!({"id": "1"})).await.unwrap_err();
        assert!(matches!(err.source, BindingError::Credential(_)));
        assert!(err.to_string().contains("API_TOKEN"));
        assert!(f.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_executor() {
        let f = fixture();
        let sql = config(json!({"type": "sql", "connection": "${API_TOKEN}", "query": "SELECT 1"}));
        let err = tool(&f, sql).invoke(json!({"id": "1"})).await.unwrap_err();
        assert!(matches!(err.source, BindingError::ExecutorNotFound { .. }));
        assert_eq!(f.recorder.records()[0].binding_type, "sql");
    }

    #[tokio::test]
    async fn test_shadow_mode_is_recorded() {
        let f = fixture();
        let shadow = config(json!({
            "type": "http",
            "method": "POST",
            "mode": "shadow",
            "url": "https://api.example.com/orders"
        }));
        let value = tool(&f, shadow).call(json!({"id": "1"})).await.unwrap();
        assert_eq!(value["_shadow"], json!(true));

        let records = f.recorder.records();
        assert_eq!(records[0].mode, crate::config::BindingMode::Shadow);
    }

    #[tokio::test]
    async fn test_recorder_failure_does_not_change_outcome() {
        let f = fixture();
        let tool = BindingTool::new(
            "get_order",
            "",
            schema(),
            get_config(),
            f.registry.clone(),
            f.resolver.clone(),
        )
        .with_recorder(Arc::new(FailingRecorder));

        assert!(tool.invoke(json!({"id": "1"})).await.is_ok());
        assert!(tool.invoke(json!({"id": "1", "fail": "transport"})).await.is_err());
    }

    #[tokio::test]
    async fn test_summary_is_truncated() {
        let f = fixture();
        let tool = tool(&f, get_config()).with_summary_max_chars(40);
        let long = "x".repeat(200);
        tool.invoke(json!({"id": long})).await.unwrap();

        let summary = &f.recorder.records()[0].result_summary;
        assert!(summary.ends_with(TRUNCATION_MARKER));
        assert_eq!(summary.chars().count(), 40 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_truncate_char_boundary() {
        assert_eq!(truncate("héllo wörld", 3), "hél...[truncated]");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_definition() {
        let f = fixture();
        let definition = tool(&f, get_config()).definition();
        assert_eq!(definition.name, "get_order");
        assert_eq!(definition.description, "Fetch one order");
        assert_eq!(definition.input_schema, schema());
    }
}
