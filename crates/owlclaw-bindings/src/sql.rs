//! SQL binding executor.
//!
//! Statements reach the driver as text plus bound named parameters; argument
//! values are never spliced into SQL. Writes fail closed unless the binding
//! sets `read_only: false` and the [`RiskGate`] approves.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use owlclaw_core::SecretValue;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{BindingConfig, BindingKind, SqlBinding};
use crate::credentials::CredentialResolver;
use crate::error::BindingError;
use crate::executor::{BindingExecutor, mismatched};
use crate::query::scan_query;
use crate::result::{ExecutionResult, ResultStatus};
use crate::retry::{Sleeper, TokioSleeper, run_with_retry};

/// One result row, column name → value.
pub type Row = Map<String, Value>;

/// Statement text and its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// SQL with `:named` placeholders, unchanged from the declaration.
    pub text: String,
    /// Placeholder name → bound value.
    pub parameters: Vec<(String, Value)>,
}

impl SqlStatement {
    /// Parameters as a JSON mapping.
    #[must_use]
    pub fn parameters_value(&self) -> Value {
        Value::Object(
            self.parameters
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

/// Database driver boundary.
#[async_trait]
pub trait SqlBackend: Send + Sync + fmt::Debug {
    /// Run a read and return at most `max_rows` rows.
    ///
    /// # Errors
    ///
    /// `Transport` or `Timeout` for retryable failures, `Execution` otherwise.
    async fn fetch(
        &self,
        connection: &SecretValue,
        statement: &SqlStatement,
        max_rows: usize,
    ) -> Result<Vec<Row>, BindingError>;

    /// Run a write and return the affected row count.
    ///
    /// # Errors
    ///
    /// `Transport` or `Timeout` for retryable failures, `Execution` otherwise.
    async fn execute(
        &self,
        connection: &SecretValue,
        statement: &SqlStatement,
    ) -> Result<u64, BindingError>;
}

/// A write waiting for approval.
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    /// Statement to be run.
    pub statement: &'a SqlStatement,
    /// Whether the binding is in shadow mode.
    pub shadow: bool,
}

/// Governance hook consulted before any SQL write.
#[async_trait]
pub trait RiskGate: Send + Sync + fmt::Debug {
    /// Approve the write, or return the reason it is refused.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason.
    async fn approve(&self, request: WriteRequest<'_>) -> Result<(), String>;
}

/// Refuses every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyWrites;

#[async_trait]
impl RiskGate for DenyWrites {
    async fn approve(&self, _request: WriteRequest<'_>) -> Result<(), String> {
        Err("SQL writes require approval from a risk gate".to_string())
    }
}

/// Approves every write. Only for callers that gate writes elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproveWrites;

#[async_trait]
impl RiskGate for ApproveWrites {
    async fn approve(&self, _request: WriteRequest<'_>) -> Result<(), String> {
        Ok(())
    }
}

/// Executes `type: sql` bindings against an injected backend.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    backend: Arc<dyn SqlBackend>,
    gate: Arc<dyn RiskGate>,
    sleeper: Arc<dyn Sleeper>,
}

impl SqlExecutor {
    /// Executor that denies writes.
    #[must_use]
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self {
            backend,
            gate: Arc::new(DenyWrites),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the risk gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn RiskGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

#[async_trait]
impl BindingExecutor for SqlExecutor {
    fn binding_type(&self) -> &'static str {
        "sql"
    }

    async fn execute(
        &self,
        config: &BindingConfig,
        parameters: &Map<String, Value>,
        resolver: &CredentialResolver,
    ) -> Result<ExecutionResult, BindingError> {
        let BindingKind::Sql(sql) = &config.kind else {
            return Err(mismatched("sql", config));
        };

        let statement = bind_statement(sql, parameters)?;

        if !sql.read_only {
            let request = WriteRequest {
                statement: &statement,
                shadow: config.is_shadow(),
            };
            if let Err(reason) = self.gate.approve(request).await {
                warn!(reason = %reason, "SQL write denied");
                return Err(BindingError::WriteDenied(reason));
            }

            if config.is_shadow() {
                info!("Shadow mode: SQL write intercepted");
                return Ok(ExecutionResult::shadow()
                    .with_extra("_query", statement.text.clone())
                    .with_extra("_parameters", statement.parameters_value()));
            }
        }

        let connection = resolver.resolve_credential("connection", &sql.connection)?;

        if sql.read_only {
            let mut rows = run_with_retry(
                &config.retry,
                config.timeout_ms,
                self.sleeper.as_ref(),
                "sql.fetch",
                |_| self.backend.fetch(&connection, &statement, sql.max_rows),
            )
            .await?;
            rows.truncate(sql.max_rows);

            debug!(row_count = rows.len(), "SQL read completed");
            let row_count = rows.len();
            Ok(
                ExecutionResult::success(Value::Array(rows.into_iter().map(Value::Object).collect()))
                    .with_extra("row_count", row_count),
            )
        } else {
            let affected = run_with_retry(
                &config.retry,
                config.timeout_ms,
                self.sleeper.as_ref(),
                "sql.execute",
                |_| self.backend.execute(&connection, &statement),
            )
            .await?;

            debug!(affected_rows = affected, "SQL write completed");
            Ok(ExecutionResult::new(ResultStatus::Success)
                .with_extra("affected_rows", affected))
        }
    }
}

/// Bind each placeholder to the argument its mapping names.
///
/// Arguments that no placeholder maps to are ignored.
///
/// # Errors
///
/// Returns `InvalidParameters` when a mapped argument is missing.
pub fn bind_statement(
    sql: &SqlBinding,
    parameters: &Map<String, Value>,
) -> Result<SqlStatement, BindingError> {
    let scan = scan_query(&sql.query);
    let mut bound = Vec::with_capacity(scan.placeholders.len());

    for placeholder in scan.placeholders {
        let argument = sql.parameter_mapping.get(&placeholder).ok_or_else(|| {
            BindingError::InvalidParameters(format!(
                "placeholder ':{placeholder}' has no parameter_mapping entry"
            ))
        })?;
        let value = parameters.get(argument).ok_or_else(|| {
            BindingError::InvalidParameters(format!(
                "missing argument '{argument}' for placeholder ':{placeholder}'"
            ))
        })?;
        bound.push((placeholder, value.clone()));
    }

    Ok(SqlStatement {
        text: sql.query.clone(),
        parameters: bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MapSource;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeBackend {
        rows: Vec<Row>,
        fetched: Mutex<Vec<(String, SqlStatement, usize)>>,
        executed: Mutex<Vec<SqlStatement>>,
    }

    #[async_trait]
    impl SqlBackend for FakeBackend {
        async fn fetch(
            &self,
            connection: &SecretValue,
            statement: &SqlStatement,
            max_rows: usize,
        ) -> Result<Vec<Row>, BindingError> {
            self.fetched.lock().unwrap().push((
                connection.expose().to_string(),
                statement.clone(),
                max_rows,
            ));
            Ok(self.rows.iter().take(max_rows).cloned().collect())
        }

        async fn execute(
            &self,
            _connection: &SecretValue,
            statement: &SqlStatement,
        ) -> Result<u64, BindingError> {
            self.executed.lock().unwrap().push(statement.clone());
            Ok(3)
        }
    }

    fn row(id: &str) -> Row {
        json!({"id": id, "total": 10}).as_object().cloned().unwrap()
    }

    fn resolver() -> CredentialResolver {
        CredentialResolver::new()
            .with_environment(MapSource::new().with("PG_URL", "postgres://db/orders"))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn write_config(mode: &str) -> BindingConfig {
        BindingConfig::parse(&json!({
            "type": "sql",
            "mode": mode,
            "connection": "${PG_URL}",
            "query": "UPDATE orders SET status = :status WHERE id = :id",
            "read_only": false,
            "parameter_mapping": {"status": "new_status", "id": "order_id"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_read_binds_named_parameters() {
        let backend = Arc::new(FakeBackend {
            rows: vec![row("42"), row("43")],
            ..FakeBackend::default()
        });
        let executor = SqlExecutor::new(backend.clone());
        let config = BindingConfig::parse(&json!({
            "type": "sql",
            "connection": "${PG_URL}",
            "query": "SELECT * FROM orders WHERE id = :id",
            "parameter_mapping": {"id": "order_id"},
            "max_rows": 1
        }))
        .unwrap();

        let result = executor
            .execute(&config, &args(json!({"order_id": "42", "extra": "ignored"})), &resolver())
            .await
            .unwrap();

        assert_eq!(result.data, Some(json!([{"id": "42", "total": 10}])));
        assert_eq!(result.extra("row_count"), Some(&json!(1)));

        let fetched = backend.fetched.lock().unwrap();
        let (connection, statement, max_rows) = &fetched[0];
        assert_eq!(connection, "postgres://db/orders");
        assert_eq!(statement.text, "SELECT * FROM orders WHERE id = :id");
        assert_eq!(statement.parameters, vec![("id".to_string(), json!("42"))]);
        assert_eq!(*max_rows, 1);
    }

    #[tokio::test]
    async fn test_write_denied_by_default() {
        let backend = Arc::new(FakeBackend::default());
        let executor = SqlExecutor::new(backend.clone());

        for mode in ["active", "shadow"] {
            let err = executor
                .execute(
                    &write_config(mode),
                    &args(json!({"new_status": "paid", "order_id": 1})),
                    &resolver(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, BindingError::WriteDenied(_)));
        }
        assert!(backend.executed.lock().unwrap().is_empty());
        assert!(backend.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_denied_before_credentials_are_resolved() {
        let executor = SqlExecutor::new(Arc::new(FakeBackend::default()));
        let err = executor
            .execute(
                &write_config("active"),
                &args(json!({"new_status": "paid", "order_id": 1})),
                &CredentialResolver::new().with_environment(MapSource::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::WriteDenied(_)));
    }

    #[tokio::test]
    async fn test_approved_write() {
        let backend = Arc::new(FakeBackend::default());
        let executor = SqlExecutor::new(backend.clone()).with_gate(Arc::new(ApproveWrites));

        let result = executor
            .execute(
                &write_config("active"),
                &args(json!({"new_status": "paid", "order_id": 1})),
                &resolver(),
            )
            .await
            .unwrap();

        assert_eq!(result.extra("affected_rows"), Some(&json!(3)));
        let executed = backend.executed.lock().unwrap();
        assert_eq!(
            executed[0].parameters,
            vec![
                ("status".to_string(), json!("paid")),
                ("id".to_string(), json!(1))
            ]
        );
    }

    #[tokio::test]
    async fn test_approved_shadow_write_is_synthetic() {
        let backend = Arc::new(FakeBackend::default());
        let executor = SqlExecutor::new(backend.clone()).with_gate(Arc::new(ApproveWrites));

        let result = executor
            .execute(
                &write_config("shadow"),
                &args(json!({"new_status": "paid", "order_id": 1})),
                &resolver(),
            )
            .await
            .unwrap();

        assert!(result.shadow);
        assert_eq!(
            result.extra("_query"),
            Some(&json!("UPDATE orders SET status = :status WHERE id = :id"))
        );
        assert_eq!(
            result.extra("_parameters"),
            Some(&json!({"status": "paid", "id": 1}))
        );
        assert!(backend.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shadow_read_executes() {
        let backend = Arc::new(FakeBackend {
            rows: vec![row("1")],
            ..FakeBackend::default()
        });
        let executor = SqlExecutor::new(backend.clone());
        let config = BindingConfig::parse(&json!({
            "type": "sql",
            "mode": "shadow",
            "connection": "${PG_URL}",
            "query": "SELECT * FROM orders"
        }))
        .unwrap();

        let result = executor.execute(&config, &Map::new(), &resolver()).await.unwrap();
        assert!(!result.shadow);
        assert_eq!(backend.fetched.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_argument() {
        let BindingKind::Sql(sql) = write_config("active").kind else {
            panic!("expected sql binding");
        };
        let err = bind_statement(&sql, &args(json!({"new_status": "paid"}))).unwrap_err();
        assert!(err.to_string().contains("'order_id'"));
    }
}
