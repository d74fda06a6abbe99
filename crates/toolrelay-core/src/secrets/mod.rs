//! Secret lookup for API keys and tool server environments
//!
//! - `SecretStore` trait for pluggable stores
//! - `EnvSecretStore`: read-only, backed by process environment
//! - `MemorySecretStore`: read-write, for tests and embedding
//! - `expand_placeholders`: resolves `${VAR}` references in config values

mod env_store;
mod memory_store;
mod traits;

pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{expand_placeholders, SecretStore, SecretStoreError, SecretStoreResult};
