//! Engine configuration loading and validation.
//!
//! Uses JSON5 so hand-edited config files may carry comments.
//! Config location: `~/.owlclaw/owlclaw.json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Binding engine behaviour.
    #[serde(default)]
    pub engine: EngineSettings,

    /// HTTP executor client settings.
    #[serde(default)]
    pub http: HttpSettings,

    /// Encrypted secret store settings.
    #[serde(default)]
    pub secrets: SecretsSettings,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl EngineConfig {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if config exists but cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("owlclaw.json")
    }

    /// Get the `OwlClaw` state directory.
    ///
    /// Uses `OWLCLAW_STATE_DIR` env var if set, otherwise `~/.owlclaw`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("OWLCLAW_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".owlclaw")
        } else {
            PathBuf::from(".owlclaw")
        }
    }

    /// Directory holding the encrypted secret store.
    #[must_use]
    pub fn secrets_dir(&self) -> PathBuf {
        self.secrets
            .store_dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("secrets"))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.summary_max_chars < MIN_SUMMARY_CHARS {
            return Err(ConfigError::Validation(format!(
                "engine.summaryMaxChars must be at least {MIN_SUMMARY_CHARS}"
            )));
        }

        if self.http.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "http.connectTimeoutMs cannot be 0".to_string(),
            ));
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "http.userAgent cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

const MIN_SUMMARY_CHARS: usize = 32;

/// Binding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Maximum characters kept in an audit result summary.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// How secret-heuristic findings in declarations are treated.
    #[serde(default)]
    pub validation: ValidationMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            summary_max_chars: default_summary_max_chars(),
            validation: ValidationMode::default(),
        }
    }
}

const fn default_summary_max_chars() -> usize {
    500
}

/// Severity of secret-heuristic findings during declaration validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Findings are validation errors.
    #[default]
    Strict,
    /// Findings are reported as warnings.
    Lenient,
}

/// HTTP client settings shared by every HTTP binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSettings {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long idle pooled connections are kept, in seconds.
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    format!("owlclaw/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_pool_idle_timeout_secs() -> u64 {
    90
}

/// Encrypted secret store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsSettings {
    /// Consult the encrypted store after overrides and the environment.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Store directory override.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            store_dir: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.engine.summary_max_chars, 500);
        assert_eq!(config.engine.validation, ValidationMode::Strict);
        assert!(config.secrets.enabled);
        assert!(config.http.user_agent.starts_with("owlclaw/"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("owlclaw.json");

        let mut config = EngineConfig::default();
        config.engine.validation = ValidationMode::Lenient;
        config.http.connect_timeout_ms = 750;

        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.engine.validation, ValidationMode::Lenient);
        assert_eq!(loaded.http.connect_timeout_ms, 750);
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // comments are allowed
            engine: {
                summaryMaxChars: 1200,
                validation: "lenient",
            },
            settings: { logFormat: "json" },
        }"#;

        let config: EngineConfig = json5::from_str(json5_content).unwrap();
        assert_eq!(config.engine.summary_max_chars, 1200);
        assert_eq!(config.engine.validation, ValidationMode::Lenient);
        assert_eq!(config.settings.log_format, LogFormat::Json);
        assert_eq!(config.http.pool_idle_timeout_secs, 90);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.engine.summary_max_chars = 4;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.http.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_dir_override() {
        let mut config = EngineConfig::default();
        config.secrets.store_dir = Some(PathBuf::from("/tmp/owl-secrets"));
        assert_eq!(config.secrets_dir(), PathBuf::from("/tmp/owl-secrets"));
    }
}
