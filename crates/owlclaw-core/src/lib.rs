//! # OwlClaw Core
//!
//! Core configuration, secrets, and security primitives for OwlClaw.
//!
//! This crate provides:
//! - Engine configuration loading and validation (JSON5 format)
//! - Secrets management with encryption at rest
//! - Secret-leak heuristics and `${VAR}` credential reference parsing
//! - Tool parameter validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod scan;
pub mod secrets;
pub mod validation;

pub use config::{ConfigError, EngineConfig, ValidationMode};
pub use scan::{SecretFinding, credential_references, detect_secret};
pub use secrets::{CredentialStore, CredentialStoreError, SecretValue, scrub_secrets};
pub use validation::{ValidationError, validate_tool_params};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::scan::{credential_references, detect_secret};
    pub use crate::secrets::SecretValue;
    pub use crate::validation::validate_tool_params;
}
