//! Binding types command.

use anyhow::Result;
use owlclaw_bindings::config::SUPPORTED_TYPES;
use owlclaw_core::EngineConfig;

use crate::ui;

/// List every declarable binding type and whether this build executes it.
pub fn run_types(config: &EngineConfig) -> Result<()> {
    let registry = super::build_registry(config)?;

    ui::header("Binding types");
    ui::table_row(&[("TYPE", 10), ("EXECUTOR", 12)]);
    for &binding_type in SUPPORTED_TYPES {
        let executor = if registry.contains(binding_type) {
            "built-in"
        } else {
            "external"
        };
        ui::table_row(&[(binding_type, 10), (executor, 12)]);
    }
    ui::info("External types need a driver registered by the embedding application");
    Ok(())
}
