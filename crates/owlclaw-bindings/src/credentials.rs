//! Credential resolution.
//!
//! `${NAME}` references are resolved fresh on every call through a fixed
//! priority chain: explicit overrides, then the environment source, then the
//! optional secret store. Nothing is cached. Errors carry variable names only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use owlclaw_core::scan::{self, REFERENCE_PATTERN};
use owlclaw_core::{CredentialStore, CredentialStoreError, SecretValue};
use serde_json::Value;

use crate::error::CredentialError;

/// A place secrets can be looked up by name.
pub trait SecretSource: Send + Sync + fmt::Debug {
    /// Short label used in logs.
    fn label(&self) -> &'static str;

    /// Look up `name`. `Ok(None)` means this source does not know it.
    ///
    /// # Errors
    ///
    /// Returns an error when the source itself fails.
    fn lookup(&self, name: &str) -> Result<Option<SecretValue>, CredentialError>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentSource;

impl SecretSource for EnvironmentSource {
    fn label(&self) -> &'static str {
        "environment"
    }

    fn lookup(&self, name: &str) -> Result<Option<SecretValue>, CredentialError> {
        Ok(std::env::var(name).ok().map(SecretValue::from))
    }
}

/// In-memory name → value map.
///
/// Used for explicit overrides, and in tests in place of the environment.
#[derive(Default, Clone)]
pub struct MapSource {
    values: HashMap<String, SecretValue>,
}

impl MapSource {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SecretValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace one entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SecretValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("MapSource").field("names", &names).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for MapSource
where
    K: Into<String>,
    V: Into<SecretValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut source = Self::new();
        for (name, value) in iter {
            source.insert(name, value);
        }
        source
    }
}

impl SecretSource for MapSource {
    fn label(&self) -> &'static str {
        "map"
    }

    fn lookup(&self, name: &str) -> Result<Option<SecretValue>, CredentialError> {
        Ok(self.values.get(name).cloned())
    }
}

impl SecretSource for CredentialStore {
    fn label(&self) -> &'static str {
        "store"
    }

    fn lookup(&self, name: &str) -> Result<Option<SecretValue>, CredentialError> {
        match self.load(name) {
            Ok(value) => Ok(Some(value)),
            Err(CredentialStoreError::NotFound(_)) => Ok(None),
            Err(CredentialStoreError::InvalidName(name)) => Err(CredentialError::InvalidName(name)),
            Err(e) => Err(CredentialError::Store(e.to_string())),
        }
    }
}

/// Resolves `${NAME}` references to secret values.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    overrides: MapSource,
    environment: Arc<dyn SecretSource>,
    store: Option<Arc<dyn SecretSource>>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    /// Resolver backed by the process environment only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            overrides: MapSource::new(),
            environment: Arc::new(EnvironmentSource),
            store: None,
        }
    }

    /// Set explicit overrides, consulted before anything else.
    #[must_use]
    pub fn with_overrides(mut self, overrides: MapSource) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the environment source.
    #[must_use]
    pub fn with_environment(mut self, source: impl SecretSource + 'static) -> Self {
        self.environment = Arc::new(source);
        self
    }

    /// Add a secret store, consulted last.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SecretSource>) -> Self {
        self.store = Some(store);
        self
    }

    /// Look up one name through the chain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for malformed names, `Unresolved` when no source
    /// knows the name, or the first source failure.
    pub fn lookup(&self, name: &str) -> Result<SecretValue, CredentialError> {
        if !scan::is_valid_reference_name(name) {
            return Err(CredentialError::InvalidName(name.to_string()));
        }

        let chain: [Option<&dyn SecretSource>; 3] = [
            Some(&self.overrides),
            Some(self.environment.as_ref()),
            self.store.as_deref(),
        ];
        for source in chain.into_iter().flatten() {
            if let Some(value) = source.lookup(name)? {
                tracing::trace!(name, source = source.label(), "Credential resolved");
                return Ok(value);
            }
        }

        Err(CredentialError::Unresolved {
            name: name.to_string(),
        })
    }

    /// Substitute every `${NAME}` in `value`. Substituted text is not re-scanned.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure.
    pub fn resolve(&self, value: &str) -> Result<String, CredentialError> {
        let mut resolved = String::with_capacity(value.len());
        let mut last = 0;

        for caps in REFERENCE_PATTERN.captures_iter(value) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            resolved.push_str(&value[last..whole.start()]);
            resolved.push_str(self.lookup(name.as_str())?.expose());
            last = whole.end();
        }

        resolved.push_str(&value[last..]);
        Ok(resolved)
    }

    /// Resolve every string leaf of `value`, leaving other values untouched.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure.
    pub fn resolve_mapping(&self, value: &Value) -> Result<Value, CredentialError> {
        Ok(match value {
            Value::String(s) => Value::String(self.resolve(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_mapping(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.resolve_mapping(v)?)))
                    .collect::<Result<_, CredentialError>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Resolve a credential-typed field.
    ///
    /// The value must contain a reference and no secret-looking literal text.
    ///
    /// # Errors
    ///
    /// Returns `PlaintextSecret` for literals, otherwise any lookup failure.
    pub fn resolve_credential(&self, field: &str, value: &str) -> Result<SecretValue, CredentialError> {
        if !scan::contains_reference(value) {
            return Err(CredentialError::PlaintextSecret {
                field: field.to_string(),
                reason: "value contains no ${VAR} reference".to_string(),
            });
        }
        if let Some(finding) = scan::detect_secret(value) {
            return Err(CredentialError::PlaintextSecret {
                field: field.to_string(),
                reason: finding.to_string(),
            });
        }
        self.resolve(value).map(SecretValue::from)
    }

    /// Check that every name resolves, without returning values.
    ///
    /// # Errors
    ///
    /// Returns the first name that fails to resolve.
    pub fn ensure_resolvable<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), CredentialError> {
        for name in names {
            self.lookup(name)?;
        }
        Ok(())
    }
}
