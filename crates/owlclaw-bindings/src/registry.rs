//! Registry of executors keyed by binding type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BindingError;
use crate::executor::BindingExecutor;

/// Executors available to binding tools.
///
/// Built explicitly and shared behind `Arc`; there is no global instance.
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn BindingExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor under its binding type, returning any executor it replaced.
    pub fn register(
        &mut self,
        executor: Arc<dyn BindingExecutor>,
    ) -> Option<Arc<dyn BindingExecutor>> {
        let binding_type = executor.binding_type().to_string();
        tracing::debug!(binding_type = %binding_type, "Registered binding executor");
        self.executors.insert(binding_type, executor)
    }

    /// Register an executor, builder style.
    #[must_use]
    pub fn with(mut self, executor: Arc<dyn BindingExecutor>) -> Self {
        self.register(executor);
        self
    }

    /// Executor for `binding_type`.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorNotFound` listing every registered type.
    pub fn get(&self, binding_type: &str) -> Result<Arc<dyn BindingExecutor>, BindingError> {
        self.executors
            .get(binding_type)
            .cloned()
            .ok_or_else(|| BindingError::ExecutorNotFound {
                binding_type: binding_type.to_string(),
                available: self.list_types(),
            })
    }

    /// Whether an executor is registered for `binding_type`.
    #[must_use]
    pub fn contains(&self, binding_type: &str) -> bool {
        self.executors.contains_key(binding_type)
    }

    /// Registered types, sorted.
    #[must_use]
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.executors.keys().cloned().collect();
        types.sort();
        types
    }

    /// Number of registered executors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingConfig;
    use crate::credentials::CredentialResolver;
    use crate::result::ExecutionResult;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    struct StubExecutor(&'static str);

    #[async_trait]
    impl BindingExecutor for StubExecutor {
        fn binding_type(&self) -> &'static str {
            self.0
        }

        async fn execute(
            &self,
            _config: &BindingConfig,
            _parameters: &Map<String, Value>,
            _resolver: &CredentialResolver,
        ) -> Result<ExecutionResult, BindingError> {
            Ok(ExecutionResult::success(json!(self.0)))
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ExecutorRegistry::new()
            .with(Arc::new(StubExecutor("sql")))
            .with(Arc::new(StubExecutor("http")));

        assert_eq!(registry.get("http").unwrap().binding_type(), "http");
        assert_eq!(registry.list_types(), vec!["http", "sql"]);
        assert!(registry.contains("sql"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_type_lists_available() {
        let registry = ExecutorRegistry::new()
            .with(Arc::new(StubExecutor("queue")))
            .with(Arc::new(StubExecutor("http")));

        let Err(err) = registry.get("grpc") else {
            panic!("expected lookup failure");
        };
        match &err {
            BindingError::ExecutorNotFound {
                binding_type,
                available,
            } => {
                assert_eq!(binding_type, "grpc");
                assert_eq!(available, &vec!["http".to_string(), "queue".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("http, queue"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ExecutorRegistry::new();
        assert!(registry.register(Arc::new(StubExecutor("http"))).is_none());
        assert!(registry.register(Arc::new(StubExecutor("http"))).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_validate_config() {
        let executor = StubExecutor("http");
        assert!(
            executor
                .validate_config(&json!({"type": "http", "url": "https://x.example"}))
                .is_empty()
        );
        let errors = executor.validate_config(&json!({"type": "sql", "query": "SELECT 1"}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot run binding type 'sql'"));
    }

    #[test]
    fn test_isolated_instances() {
        let a = ExecutorRegistry::new().with(Arc::new(StubExecutor("http")));
        let b = ExecutorRegistry::new();
        assert!(a.contains("http"));
        assert!(b.is_empty());
    }
}
