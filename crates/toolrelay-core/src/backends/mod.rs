//! Completion backends
//!
//! The turn orchestrator talks to every backend through
//! [`CompletionBackend`]. Two variants exist:
//!
//! - [`TextSentinelBackend`]: formats the conversation into sentinel-framed
//!   text, sends it over a [`CompletionTransport`] and parses the completion
//! - [`StructuredBackend`]: native function calling through `genai`
//!
//! [`MockTransport`] is kept for testing purposes.

mod error;
mod http;
mod mock;
mod sentinel;
mod structured;
mod traits;

pub use error::{BackendError, BackendResult};
pub use http::{completions_url, HttpTransport};
pub use mock::{MockMode, MockStep, MockTransport};
pub use sentinel::TextSentinelBackend;
pub use structured::StructuredBackend;
pub use traits::{BackendReply, CompletionBackend, CompletionRequest, CompletionTransport};

use std::sync::Arc;

use crate::logging::Logger;
use crate::protocol::PromptFormatter;
use crate::secrets::SecretStore;
use crate::types::{BackendConfig, BackendKind};

/// Resolve the API key named by `config.api_key_env`
///
/// A backend with no `api_key_env` sends no credentials.
pub fn resolve_api_key(
    config: &BackendConfig,
    secrets: &dyn SecretStore,
) -> BackendResult<Option<String>> {
    match &config.api_key_env {
        None => Ok(None),
        Some(var) => secrets
            .get(var)
            .map(Some)
            .ok_or_else(|| BackendError::missing_api_key(&config.name, var)),
    }
}

/// Create the backend described by `config`
///
/// `system_prompt` overrides the default instruction preamble of text
/// sentinel backends.
pub fn create_backend(
    config: &BackendConfig,
    secrets: &dyn SecretStore,
    system_prompt: Option<&str>,
    logger: Arc<dyn Logger>,
) -> BackendResult<Arc<dyn CompletionBackend>> {
    let api_key = resolve_api_key(config, secrets)?;
    logger.info(&format!(
        "[Backends] Creating {} backend '{}' ({})",
        config.kind, config.name, config.model
    ));

    match config.kind {
        BackendKind::TextSentinel => {
            let transport = HttpTransport::new(config, api_key, Arc::clone(&logger))?;
            Ok(Arc::new(TextSentinelBackend::new(
                config,
                PromptFormatter::with_optional_prompt(system_prompt),
                Arc::new(transport),
                logger,
            )))
        }
        BackendKind::Structured => Ok(Arc::new(StructuredBackend::new(config, api_key, logger))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_resolve_api_key() {
        let secrets = MemorySecretStore::new();
        let config = BackendConfig::chutes();
        assert!(matches!(
            resolve_api_key(&config, &secrets),
            Err(BackendError::MissingApiKey { .. })
        ));

        secrets.store_sync("CHUTES_API_TOKEN", "tok");
        assert_eq!(resolve_api_key(&config, &secrets).unwrap().as_deref(), Some("tok"));

        let mut local = BackendConfig::chutes();
        local.api_key_env = None;
        assert_eq!(resolve_api_key(&local, &secrets).unwrap(), None);
    }

    #[test]
    fn test_create_backend_by_kind() {
        let secrets = MemorySecretStore::new();
        secrets.store_sync("CHUTES_API_TOKEN", "tok");
        secrets.store_sync("OPENROUTER_API_KEY", "key");

        let chutes =
            create_backend(&BackendConfig::chutes(), &secrets, None, Arc::new(NoOpLogger)).unwrap();
        assert_eq!(chutes.name(), "chutes");

        let openrouter = create_backend(
            &BackendConfig::openrouter(),
            &secrets,
            Some("Be terse."),
            Arc::new(NoOpLogger),
        )
        .unwrap();
        assert_eq!(openrouter.name(), "openrouter");
    }

    #[test]
    fn test_create_backend_without_key_fails() {
        let result = create_backend(
            &BackendConfig::chutes(),
            &MemorySecretStore::new(),
            None,
            Arc::new(NoOpLogger),
        );
        assert!(result.is_err());
    }
}
