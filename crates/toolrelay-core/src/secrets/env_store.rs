//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from service names to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("chutes", vec!["CHUTES_API_TOKEN", "CHUTES_API_KEY"]);
    m.insert("openrouter", vec!["OPENROUTER_API_KEY"]);
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("deepseek", vec!["DEEPSEEK_API_KEY"]);
    m.insert("brave", vec!["BRAVE_API_KEY"]);
    m.insert("brave_search", vec!["BRAVE_API_KEY"]);
    m.insert("github", vec!["GITHUB_PERSONAL_ACCESS_TOKEN", "GITHUB_TOKEN"]);
    m
});

/// Secret store that reads from environment variables
///
/// Read-only. Lookups try, in order: the key as a variable name, the
/// service mapping (`github` → `GITHUB_PERSONAL_ACCESS_TOKEN`, `GITHUB_TOKEN`),
/// then `<KEY>_API_KEY`. Empty values count as unset.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Get the environment variable names for a service
    pub fn env_vars_for(service: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(service.to_lowercase().as_str()).map(|v| v.as_slice())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = non_empty_var(key) {
            return Some(value);
        }

        if let Some(env_vars) = Self::env_vars_for(key) {
            if let Some(value) = env_vars.iter().find_map(|var| non_empty_var(var)) {
                return Some(value);
            }
        }

        non_empty_var(&format!("{}_API_KEY", key.to_uppercase()))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}
