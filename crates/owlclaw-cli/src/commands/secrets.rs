//! Encrypted secret store commands.

use anyhow::{Context, Result};
use owlclaw_core::{CredentialStore, EngineConfig, SecretValue};

use crate::ui;

/// What to do with the store.
#[derive(Debug, Clone)]
pub enum SecretsAction {
    /// Store a secret, prompting when no value is given.
    Set {
        /// Secret name.
        name: String,
        /// Secret value.
        value: Option<String>,
    },
    /// List names.
    List,
    /// Delete a secret.
    Delete {
        /// Secret name.
        name: String,
        /// Skip confirmation.
        yes: bool,
    },
}

/// Run a secrets command.
pub fn run_secrets(config: &EngineConfig, action: SecretsAction) -> Result<()> {
    let store = super::open_store(config, true)?
        .context("secret store is disabled (secrets.enabled = false)")?;

    match action {
        SecretsAction::Set { name, value } => {
            let value = match value {
                Some(v) => v,
                None => ui::prompts::password(&format!("Value for {name}"))?,
            };
            set_secret(&store, &name, value)?;
            ui::success(&format!("Stored {name}; reference it as ${{{name}}}"));
        }
        SecretsAction::List => {
            let names = store.list()?;
            ui::header(&format!("Secrets in {}", store.path().display()));
            if names.is_empty() {
                ui::info("No secrets stored");
            }
            for name in names {
                ui::kv(&name, "********");
            }
        }
        SecretsAction::Delete { name, yes } => {
            if !yes && !ui::prompts::confirm(&format!("Delete secret {name}?"))? {
                ui::info("Delete cancelled");
                return Ok(());
            }
            store.delete(&name)?;
            ui::success(&format!("Deleted {name}"));
        }
    }
    Ok(())
}

fn set_secret(store: &CredentialStore, name: &str, value: String) -> Result<()> {
    if value.is_empty() {
        anyhow::bail!("secret value is empty");
    }
    store.store(name, &SecretValue::new(value))?;
    Ok(())
}
