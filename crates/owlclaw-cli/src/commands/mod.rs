//! CLI command implementations.

pub mod config;
pub mod invoke;
pub mod manifest;
pub mod secrets;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use owlclaw_bindings::{ExecutorRegistry, HttpExecutor};
use owlclaw_core::{CredentialStore, EngineConfig};
use tracing::{debug, info};

use crate::ui;

/// Environment variable holding the secret store passphrase.
pub const PASSPHRASE_ENV: &str = "OWLCLAW_PASSPHRASE";

/// Load the engine config, falling back to defaults when the file is absent.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(EngineConfig::default());
    }
    let config = EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    debug!(path = %path.display(), "Loaded engine config");
    Ok(config)
}

/// Executors this binary can run. SQL and queue bindings need drivers
/// supplied by an embedding application.
pub fn build_registry(config: &EngineConfig) -> Result<ExecutorRegistry> {
    let http = HttpExecutor::new(&config.http)?;
    let registry = ExecutorRegistry::new().with(Arc::new(http));
    debug!(types = ?registry.list_types(), "Executor registry ready");
    Ok(registry)
}

/// Open the encrypted secret store.
///
/// With `create` unset, a store directory that does not exist yet yields
/// `None` instead of prompting for a new passphrase.
pub fn open_store(config: &EngineConfig, create: bool) -> Result<Option<CredentialStore>> {
    if !config.secrets.enabled {
        debug!("Secret store disabled");
        return Ok(None);
    }

    let dir = config.secrets_dir();
    if !create && !dir.exists() {
        debug!(dir = %dir.display(), "No secret store yet");
        return Ok(None);
    }

    let passphrase = match std::env::var(PASSPHRASE_ENV) {
        Ok(p) => p,
        Err(_) => ui::prompts::password("Secret store passphrase")?,
    };
    let store = CredentialStore::open_with_passphrase(&passphrase, dir)?;
    info!(dir = %config.secrets_dir().display(), "Opened secret store");
    Ok(Some(store))
}
