//! Invoke one tool from a manifest.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use owlclaw_bindings::{BuildOptions, CredentialResolver, MapSource, TracingRecorder};
use owlclaw_core::EngineConfig;
use serde_json::Value;

use super::manifest::load_manifest;
use crate::ui;

/// Invoke command arguments.
#[derive(Debug, Clone)]
pub struct InvokeArgs {
    /// Manifest file.
    pub manifest: PathBuf,
    /// Tool to run.
    pub tool: String,
    /// Arguments as JSON text.
    pub args: String,
    /// Force shadow mode.
    pub shadow: bool,
    /// `NAME=VALUE` credential overrides.
    pub vars: Vec<String>,
}

/// Run the invoke command.
pub async fn run_invoke(config: &EngineConfig, args: InvokeArgs) -> Result<()> {
    let manifest = load_manifest(&args.manifest)?;
    let declaration = manifest
        .tool(&args.tool)
        .with_context(|| format!("no tool named '{}' in manifest", args.tool))?;
    let arguments = parse_arguments(&args.args)?;

    let mut resolver = CredentialResolver::new().with_overrides(parse_vars(&args.vars)?);
    if let Some(store) = super::open_store(config, false)? {
        resolver = resolver.with_store(Arc::new(store));
    }

    let options = BuildOptions::from_engine(config)
        .with_force_shadow(args.shadow)
        .with_recorder(Arc::new(TracingRecorder));
    let tool = declaration.build(
        &Arc::new(super::build_registry(config)?),
        &Arc::new(resolver),
        &options,
    )?;

    if tool.config().is_shadow() {
        ui::info("Shadow mode: side effects are reported, not performed");
    }

    tracing::debug!(
        tool = %tool.name(),
        binding_type = tool.config().binding_type(),
        shadow = tool.config().is_shadow(),
        "Invoking tool"
    );
    let spinner = ui::spinner(&format!("Invoking {}", tool.name()));
    let outcome = tool.call(arguments).await;
    spinner.finish_and_clear();

    let value = outcome?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    if value.get("status").and_then(Value::as_str) == Some("error") {
        anyhow::bail!("tool '{}' returned an error result", tool.name());
    }
    Ok(())
}

/// Parse `--args`, which must be a JSON object.
pub fn parse_arguments(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text).context("--args is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    Ok(value)
}

/// Parse `NAME=VALUE` overrides.
pub fn parse_vars(vars: &[String]) -> Result<MapSource> {
    let mut overrides = MapSource::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .context("invalid --var, expected NAME=VALUE")?;
        if name.is_empty() {
            anyhow::bail!("--var needs a name before '='");
        }
        overrides.insert(name, value);
    }
    Ok(overrides)
}
