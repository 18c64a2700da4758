//! Secrets management with encryption at rest.
//!
//! - `SecretValue`: Wrapper that prevents accidental logging
//! - `CredentialStore`: Encrypted storage for credentials referenced as `${NAME}`
//! - `derive_store_key`: Argon2 key derivation for the store
//! - `scrub_secrets`: Redact secrets from error messages

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use secrecy::{ExposeSecret, SecretBox};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroize;

use crate::scan::is_valid_reference_name;

/// Errors from credential store operations.
#[derive(Error, Debug)]
pub enum CredentialStoreError {
    /// IO error reading/writing credentials.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encryption/decryption failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid UTF-8 in decrypted data.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Credential not found.
    #[error("Credential not found: {0}")]
    NotFound(String),

    /// Credential name is not a valid reference name.
    #[error("Invalid credential name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName(String),
}

/// Secret value wrapper that prevents accidental logging.
///
/// The inner value is wrapped with `secrecy::SecretBox` so it never shows
/// up in `Debug` or `Display` output.
pub struct SecretValue(SecretBox<str>);

impl SecretValue {
    /// Create a new secret value.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(SecretBox::new(value.into_boxed_str()))
    }

    /// Expose the secret for substitution into an outbound call.
    ///
    /// Use sparingly - only when actually sending to a remote system.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretValue {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretValue([REDACTED])")
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Credential storage with encryption at rest.
///
/// Uses AES-256-GCM for authenticated encryption. Each credential lives in
/// `<store_path>/<NAME>.enc` as `nonce || ciphertext`.
pub struct CredentialStore {
    encryption_key: SecretBox<[u8; 32]>,
    store_path: PathBuf,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("store_path", &self.store_path)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Create a new credential store.
    ///
    /// # Arguments
    ///
    /// * `encryption_key` - 32-byte encryption key (see [`derive_store_key`])
    /// * `store_path` - Directory to store encrypted credentials
    #[must_use]
    pub fn new(encryption_key: [u8; 32], store_path: PathBuf) -> Self {
        Self {
            encryption_key: SecretBox::new(Box::new(encryption_key)),
            store_path,
        }
    }

    /// Open a store whose key is derived from a passphrase.
    ///
    /// The salt is read from `<store_path>/.salt`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns error if the salt cannot be read or created, or key derivation fails.
    pub fn open_with_passphrase(
        passphrase: &str,
        store_path: PathBuf,
    ) -> Result<Self, CredentialStoreError> {
        let salt = load_or_create_salt(&store_path)?;
        let key = derive_store_key(passphrase, &salt)?;
        Ok(Self::new(key, store_path))
    }

    /// Directory this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    /// Store an encrypted credential.
    ///
    /// The credential is encrypted with AES-256-GCM and written to disk
    /// with restrictive permissions (0600 on Unix).
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid, or encryption or file write fails.
    pub fn store(&self, name: &str, credential: &SecretValue) -> Result<(), CredentialStoreError> {
        let path = self.entry_path(name)?;
        std::fs::create_dir_all(&self.store_path)?;

        let encrypted = self.encrypt(credential.expose().as_bytes())?;
        std::fs::write(&path, &encrypted)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(credential = name, "stored credential");
        Ok(())
    }

    /// Load and decrypt a credential.
    ///
    /// # Errors
    ///
    /// Returns error if file not found, decryption fails, or invalid UTF-8.
    pub fn load(&self, name: &str) -> Result<SecretValue, CredentialStoreError> {
        let path = self.entry_path(name)?;

        if !path.exists() {
            return Err(CredentialStoreError::NotFound(name.to_string()));
        }

        let encrypted = std::fs::read(&path)?;
        let mut decrypted = self.decrypt(&encrypted)?;

        let value = SecretValue::new(String::from_utf8(decrypted.clone())?);

        // Clear decrypted data from memory
        decrypted.zeroize();

        Ok(value)
    }

    /// Delete a stored credential.
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid or file deletion fails.
    pub fn delete(&self, name: &str) -> Result<(), CredentialStoreError> {
        let path = self.entry_path(name)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// List all stored credential names, sorted.
    ///
    /// # Errors
    ///
    /// Returns error if directory read fails.
    pub fn list(&self) -> Result<Vec<String>, CredentialStoreError> {
        if !self.store_path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.store_path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(name) = name.strip_suffix(".enc") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, CredentialStoreError> {
        if !is_valid_reference_name(name) {
            return Err(CredentialStoreError::InvalidName(name.to_string()));
        }
        Ok(self.store_path.join(format!("{name}.enc")))
    }

    /// Encrypt data with AES-256-GCM.
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CredentialStoreError> {
        let cipher = Aes256Gcm::new(self.encryption_key.expose_secret().into());

        let nonce_bytes: [u8; 12] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|e| CredentialStoreError::Crypto(e.to_string()))?;

        Ok([nonce_bytes.as_slice(), &ciphertext].concat())
    }

    /// Decrypt data with AES-256-GCM.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CredentialStoreError> {
        if data.len() < 12 {
            return Err(CredentialStoreError::Crypto("Data too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = data.split_at(12);
        let cipher = Aes256Gcm::new(self.encryption_key.expose_secret().into());
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CredentialStoreError::Crypto(e.to_string()))
    }
}

const SALT_FILE: &str = ".salt";

/// Derive a 32-byte store key from a passphrase with Argon2id.
///
/// # Errors
///
/// Returns `CredentialStoreError::Crypto` if the salt is too short.
pub fn derive_store_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32], CredentialStoreError> {
    let mut key = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CredentialStoreError::Crypto(e.to_string()))?;
    Ok(key)
}

fn load_or_create_salt(store_path: &Path) -> Result<Vec<u8>, CredentialStoreError> {
    let salt_path = store_path.join(SALT_FILE);
    if salt_path.exists() {
        return Ok(std::fs::read(&salt_path)?);
    }

    std::fs::create_dir_all(store_path)?;
    let salt: [u8; 16] = rand::random();
    std::fs::write(&salt_path, salt)?;
    Ok(salt.to_vec())
}

/// Scrub secrets from error messages and logs.
///
/// Replaces values after known secret patterns with `[REDACTED]`.
///
/// # Arguments
///
/// * `text` - Text to scrub
/// * `patterns` - Patterns to look for (e.g., `["api_key=", "token="]`)
#[must_use]
pub fn scrub_secrets(text: &str, patterns: &[&str]) -> String {
    let mut result = text.to_string();

    for pattern in patterns {
        let mut search_start = 0;
        while let Some(start) = result[search_start..].find(pattern) {
            let abs_start = search_start + start + pattern.len();

            // Value ends at whitespace, a quote, or a separator
            let end = result[abs_start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '&' || c == ',')
                .map_or(result.len(), |e| abs_start + e);

            result.replace_range(abs_start..end, "[REDACTED]");

            search_start = abs_start + "[REDACTED]".len();
        }
    }

    result
}

/// Common secret patterns to scrub from logs.
pub const COMMON_SECRET_PATTERNS: &[&str] = &[
    "api_key=",
    "apikey=",
    "api-key=",
    "token=",
    "secret=",
    "password=",
    "Authorization: Bearer ",
    "Authorization: Basic ",
    "x-api-key: ",
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_secret_value_redaction() {
        let value = SecretValue::new("sk-secret-key-12345".to_string());

        assert_eq!(format!("{value:?}"), "SecretValue([REDACTED])");
        assert_eq!(format!("{value}"), "[REDACTED]");
        assert_eq!(value.expose(), "sk-secret-key-12345");
        assert_eq!(value.clone().expose(), "sk-secret-key-12345");
    }

    #[test]
    fn test_credential_store_roundtrip() {
        let temp = tempdir().unwrap();
        let encryption_key: [u8; 32] = rand::random();
        let store = CredentialStore::new(encryption_key, temp.path().to_path_buf());

        store
            .store("PG_URL", &SecretValue::from("postgres://u:p@db/orders"))
            .unwrap();

        let loaded = store.load("PG_URL").unwrap();
        assert_eq!(loaded.expose(), "postgres://u:p@db/orders");
    }

    #[test]
    fn test_credential_not_found() {
        let temp = tempdir().unwrap();
        let encryption_key: [u8; 32] = rand::random();
        let store = CredentialStore::new(encryption_key, temp.path().to_path_buf());

        let result = store.load("MISSING");
        assert!(matches!(result, Err(CredentialStoreError::NotFound(_))));
    }

    #[test]
    fn test_credential_invalid_name() {
        let temp = tempdir().unwrap();
        let store = CredentialStore::new([7u8; 32], temp.path().to_path_buf());

        let result = store.store("../escape", &SecretValue::from("x"));
        assert!(matches!(result, Err(CredentialStoreError::InvalidName(_))));
    }

    #[test]
    fn test_credential_list_sorted() {
        let temp = tempdir().unwrap();
        let store = CredentialStore::new([1u8; 32], temp.path().to_path_buf());

        store.store("ZETA", &SecretValue::from("v2")).unwrap();
        store.store("ALPHA", &SecretValue::from("v1")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["ALPHA", "ZETA"]);

        store.delete("ALPHA").unwrap();
        assert_eq!(store.list().unwrap(), vec!["ZETA"]);
    }

    #[test]
    fn test_passphrase_store_reopens() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("secrets");

        let store = CredentialStore::open_with_passphrase("hunter2", path.clone()).unwrap();
        store.store("API_TOKEN", &SecretValue::from("abc")).unwrap();

        let reopened = CredentialStore::open_with_passphrase("hunter2", path.clone()).unwrap();
        assert_eq!(reopened.load("API_TOKEN").unwrap().expose(), "abc");

        let wrong = CredentialStore::open_with_passphrase("wrong", path).unwrap();
        assert!(matches!(
            wrong.load("API_TOKEN"),
            Err(CredentialStoreError::Crypto(_))
        ));
    }

    #[test]
    fn test_scrub_secrets() {
        let text = "Error: api_key=sk-12345 failed with token=abc123";
        let scrubbed = scrub_secrets(text, &["api_key=", "token="]);
        assert_eq!(
            scrubbed,
            "Error: api_key=[REDACTED] failed with token=[REDACTED]"
        );
    }
}
