//! `OwlClaw` CLI - validate, scan and invoke binding declarations.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use owlclaw_core::EngineConfig;
use owlclaw_core::config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "owlclaw")]
#[command(about = "OwlClaw - declarative bindings for agent tools")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (defaults to ~/.owlclaw/owlclaw.json)
    #[arg(long, global = true, env = "OWLCLAW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every tool in a manifest
    Validate {
        /// Manifest file (JSON5)
        manifest: PathBuf,

        /// Report secret-heuristic findings as warnings
        #[arg(long)]
        lenient: bool,
    },

    /// Scan a manifest for literal secrets
    Scan {
        /// Manifest file (JSON5)
        manifest: PathBuf,
    },

    /// List binding types and whether this build can execute them
    Types,

    /// Invoke one tool from a manifest
    Invoke {
        /// Manifest file (JSON5)
        manifest: PathBuf,

        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Force shadow mode
        #[arg(long)]
        shadow: bool,

        /// Credential override, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// Encrypted secret store
    Secrets {
        #[command(subcommand)]
        action: SecretsCommands,
    },

    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SecretsCommands {
    /// Store a secret (prompts for the value when omitted)
    Set {
        /// Secret name, as used in ${NAME} references
        name: String,

        /// Secret value
        #[arg(long)]
        value: Option<String>,
    },

    /// List stored secret names
    List,

    /// Delete a secret
    Delete {
        /// Secret name
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show full configuration
    Show,

    /// Print the config file path
    Path,

    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(EngineConfig::default_path);

    // Setup logging before anything can fail
    let loaded = commands::load_engine_config(&config_path);
    let log_format = loaded
        .as_ref()
        .map(|c| c.settings.log_format)
        .unwrap_or_default();
    let debug = cli.verbose || loaded.as_ref().is_ok_and(|c| c.settings.debug);
    init_tracing(debug, log_format);

    match cli.command {
        Commands::Validate { manifest, lenient } => {
            commands::manifest::run_validate(&manifest, lenient)?;
        }

        Commands::Scan { manifest } => {
            commands::manifest::run_scan(&manifest)?;
        }

        Commands::Types => {
            commands::types::run_types(&loaded?)?;
        }

        Commands::Invoke {
            manifest,
            tool,
            args,
            shadow,
            vars,
        } => {
            let args = commands::invoke::InvokeArgs {
                manifest,
                tool,
                args,
                shadow,
                vars,
            };
            commands::invoke::run_invoke(&loaded?, args).await?;
        }

        Commands::Secrets { action } => {
            let action = match action {
                SecretsCommands::Set { name, value } => {
                    commands::secrets::SecretsAction::Set { name, value }
                }
                SecretsCommands::List => commands::secrets::SecretsAction::List,
                SecretsCommands::Delete { name, yes } => {
                    commands::secrets::SecretsAction::Delete { name, yes }
                }
            };
            commands::secrets::run_secrets(&loaded?, action)?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Path) => commands::config::ConfigAction::Path,
                Some(ConfigCommands::Validate) => commands::config::ConfigAction::Validate,
                Some(ConfigCommands::Show) | None => commands::config::ConfigAction::Show,
            };
            commands::config::run_config(&config_path, action)?;
        }
    }

    Ok(())
}

fn init_tracing(debug: bool, format: LogFormat) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}
