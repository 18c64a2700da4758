//! Binding engine errors.

use thiserror::Error;

/// A declaration failed validation. Raised at registration time, never at invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid binding configuration: {}", .errors.join("; "))]
pub struct ConfigurationError {
    /// Every problem found, in discovery order.
    pub errors: Vec<String>,
}

impl ConfigurationError {
    /// Create an error from a single message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

/// Credential resolution errors. Messages name variables, never values.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No source in the chain knows this name.
    #[error("Unresolved credential reference '${{{name}}}'")]
    Unresolved {
        /// Variable name.
        name: String,
    },

    /// A credential-typed field holds literal secret material.
    #[error("Credential field '{field}' must use ${{VAR}} references: {reason}")]
    PlaintextSecret {
        /// Field that carried the literal.
        field: String,
        /// What was wrong, without the value.
        reason: String,
    },

    /// Reference name is malformed.
    #[error("Invalid credential name '{0}'")]
    InvalidName(String),

    /// The secret store failed.
    #[error("Secret store error: {0}")]
    Store(String),
}

/// Errors raised while dispatching and executing a binding.
#[derive(Error, Debug)]
pub enum BindingError {
    /// Malformed or insecure declaration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Credential reference could not be resolved.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// No executor registered for the binding type.
    #[error(
        "No executor registered for binding type '{binding_type}'. Available types: {}",
        .available.join(", ")
    )]
    ExecutorNotFound {
        /// Requested binding type.
        binding_type: String,
        /// Types registered at lookup time, sorted.
        available: Vec<String>,
    },

    /// Arguments do not satisfy the declaration.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Connection-level failure talking to the remote system.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An attempt exceeded `timeout_ms`.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout {
        /// Per-attempt timeout that elapsed.
        timeout_ms: u64,
    },

    /// The remote system answered with a failure.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// A mutating call was refused before reaching the remote system.
    #[error("Write denied: {0}")]
    WriteDenied(String),
}

impl BindingError {
    /// Whether the retry loop may try again after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }

    /// Short stable label for audit records and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Credential(_) => "credential",
            Self::ExecutorNotFound { .. } => "executor_not_found",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Execution(_) => "execution",
            Self::WriteDenied(_) => "write_denied",
        }
    }
}

/// A tool invocation failed. Names the tool and carries the underlying cause.
#[derive(Error, Debug)]
#[error("Tool '{tool}' failed: {source}")]
pub struct ToolError {
    /// Tool name.
    pub tool: String,
    /// Underlying cause.
    #[source]
    pub source: BindingError,
}
