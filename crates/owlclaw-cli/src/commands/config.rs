//! Engine config commands.

use std::path::Path;

use anyhow::Result;
use owlclaw_core::EngineConfig;

use crate::ui;

/// What to do with the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file path.
    Path,
    /// Validate the config file.
    Validate,
}

/// Run the config command.
pub fn run_config(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => show_config(config_path),
        ConfigAction::Validate => validate_config(config_path),
    }
}

/// Show the effective configuration, defaults included.
fn show_config(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        ui::info(&format!(
            "No config file at {}; showing defaults",
            config_path.display()
        ));
    }

    let config = super::load_engine_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Validate the configuration.
fn validate_config(config_path: &Path) -> Result<()> {
    ui::header("Validating Configuration");

    if !config_path.exists() {
        ui::warning(&format!("Config file not found: {}", config_path.display()));
        ui::info("Defaults apply until one is created");
        return Ok(());
    }

    let content = std::fs::read_to_string(config_path)?;

    // Check JSON5 syntax
    let value = match json5::from_str::<serde_json::Value>(&content) {
        Ok(value) => value,
        Err(e) => {
            ui::error(&format!("Syntax error: {e}"));
            anyhow::bail!("invalid config file");
        }
    };
    ui::success("Syntax: Valid JSON5");

    let known = ["engine", "http", "secrets", "settings"];
    if let Some(sections) = value.as_object() {
        for key in sections.keys().filter(|k| !known.contains(&k.as_str())) {
            ui::warning(&format!("Unknown section '{key}' is ignored"));
        }
    }

    match EngineConfig::load(config_path) {
        Ok(config) => {
            ui::success("Schema: Configuration is valid");
            ui::kv("validation", &format!("{:?}", config.engine.validation).to_lowercase());
            ui::kv("secrets dir", &config.secrets_dir().display().to_string());
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("Schema error: {e}"));
            anyhow::bail!("invalid config file");
        }
    }
}
