//! Core traits and types for secret storage

use thiserror::Error;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Unterminated placeholder in: {0}")]
    BadPlaceholder(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for secret storage implementations
///
/// # Example
///
/// ```
/// use toolrelay_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// // store.get("chutes") checks CHUTES_API_TOKEN, then CHUTES_API_KEY
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    ///
    /// The key can be:
    /// - A service name (e.g., "brave") mapped to the usual variable names
    /// - A direct key (e.g., "BRAVE_API_KEY")
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    ///
    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support writing.
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Retrieve a secret or fail with `NotFound`
    fn require(&self, key: &str) -> SecretStoreResult<String> {
        self.get(key)
            .ok_or_else(|| SecretStoreError::NotFound(key.to_string()))
    }
}

/// Replace every `${NAME}` in `value` with the secret `NAME`
///
/// Text outside placeholders is kept as is. A missing secret is an error so a
/// tool server is never launched with a silently empty credential.
pub fn expand_placeholders(store: &dyn SecretStore, value: &str) -> SecretStoreResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| SecretStoreError::BadPlaceholder(value.to_string()))?;
        out.push_str(&store.require(after[..end].trim())?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
