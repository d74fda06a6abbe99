//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory secret store for tests and embedding
///
/// ```
/// use toolrelay_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new();
/// store.store("BRAVE_API_KEY", "bk-test").unwrap();
/// assert_eq!(store.get("BRAVE_API_KEY"), Some("bk-test".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial values
    pub fn with_secrets(initial: HashMap<String, String>) -> Self {
        Self {
            secrets: RwLock::new(initial),
        }
    }

    pub fn clear(&self) {
        self.secrets.write().clear();
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a secret without going through the trait's `Result`
    pub fn store_sync(&self, key: &str, value: &str) {
        self.secrets.write().insert(key.to_string(), value.to_string());
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.store_sync(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}

impl Clone for MemorySecretStore {
    fn clone(&self) -> Self {
        Self::with_secrets(self.secrets.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());

        store.store("key1", "value1").unwrap();
        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);

        store.store("key1", "value2").unwrap();
        assert_eq!(store.get("key1"), Some("value2".to_string()));

        store.delete("key1").unwrap();
        assert!(!store.has("key1"));
        store.delete("never-there").unwrap();
    }

    #[test]
    fn test_memory_store_clone_is_independent() {
        let store = MemorySecretStore::new();
        store.store_sync("a", "1");

        let copy = store.clone();
        store.store_sync("b", "2");

        assert_eq!(copy.get("a"), Some("1".to_string()));
        assert!(copy.get("b").is_none());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_with_secrets() {
        let mut initial = HashMap::new();
        initial.insert("GITHUB_TOKEN".to_string(), "ghp".to_string());
        let store = MemorySecretStore::with_secrets(initial);
        assert_eq!(store.get("GITHUB_TOKEN"), Some("ghp".to_string()));
    }
}
