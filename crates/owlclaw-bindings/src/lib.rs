//! # OwlClaw Bindings
//!
//! Declarative binding execution engine.
//!
//! A binding declaration describes how to call an existing system (an HTTP
//! endpoint, a message queue, a SQL database). This crate turns declarations
//! into callable tools:
//!
//! - [`BindingConfig`] parses and validates declarations, including secret
//!   heuristics over every literal string
//! - [`CredentialResolver`] substitutes `${VAR}` references from overrides,
//!   the environment and the encrypted credential store
//! - [`ExecutorRegistry`] dispatches to a [`BindingExecutor`] per binding type
//! - [`HttpExecutor`], [`SqlExecutor`] and [`QueueExecutor`] do the I/O, with
//!   per-attempt timeouts, retry with backoff, and shadow mode
//! - [`BindingTool`] times each invocation and hands one record to a
//!   [`Recorder`]
//!
//! ```no_run
//! use std::sync::Arc;
//! use owlclaw_bindings::{
//!     BindingConfig, BindingTool, CredentialResolver, ExecutorRegistry, HttpExecutor,
//! };
//! use owlclaw_core::config::HttpSettings;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BindingConfig::parse(&json!({
//!     "type": "http",
//!     "url": "https://api.example.com/orders/{id}",
//!     "response_mapping": {"path": "total"}
//! }))?;
//!
//! let registry = ExecutorRegistry::new().with(Arc::new(HttpExecutor::new(&HttpSettings::default())?));
//! let tool = BindingTool::new(
//!     "get_order_total",
//!     "Total of one order",
//!     json!({"type": "object", "properties": {"id": {"type": "string"}}}),
//!     Arc::new(config),
//!     Arc::new(registry),
//!     Arc::new(CredentialResolver::new()),
//! );
//!
//! let result = tool.call(json!({"id": "42"})).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod http;
pub mod jsonpath;
pub mod manifest;
pub mod query;
pub mod queue;
pub mod recorder;
pub mod registry;
pub mod result;
pub mod retry;
pub mod sql;
pub mod template;
pub mod tool;

pub use config::{
    BindingConfig, BindingKind, BindingMode, HttpBinding, HttpMethod, QueueBinding,
    QueueProvider, SqlBinding, ValidationReport,
};
pub use credentials::{CredentialResolver, EnvironmentSource, MapSource, SecretSource};
pub use error::{BindingError, ConfigurationError, CredentialError, ToolError};
pub use executor::BindingExecutor;
pub use http::HttpExecutor;
pub use manifest::{BuildOptions, ManifestError, ToolDeclaration, ToolManifest};
pub use queue::{QueueAdapter, QueueExecutor, QueueMessage};
pub use recorder::{InvocationRecord, InvocationStatus, MemoryRecorder, Recorder, TracingRecorder};
pub use registry::ExecutorRegistry;
pub use result::{ExecutionResult, ResultStatus};
pub use retry::{RetryConfig, Sleeper, TokioSleeper};
pub use sql::{
    ApproveWrites, DenyWrites, RiskGate, Row, SqlBackend, SqlExecutor, SqlStatement, WriteRequest,
};
pub use tool::{BindingTool, ToolDefinition};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::BindingConfig;
    pub use crate::credentials::CredentialResolver;
    pub use crate::error::{BindingError, ToolError};
    pub use crate::executor::BindingExecutor;
    pub use crate::registry::ExecutorRegistry;
    pub use crate::result::ExecutionResult;
    pub use crate::tool::BindingTool;
}
