//! Tool registry and dispatcher
//!
//! Every connected provider contributes its tools under a namespace:
//! `<provider id>__<local name>`. Dispatch splits a qualified name on the
//! first `__` to find the owning provider.
//!
//! Provider ids must not contain `__` and must not end with `_`. With that
//! rule the first `__` of a qualified name is always the namespace
//! boundary, even when local tool names contain `__` themselves.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use super::provider::ToolProvider;
use crate::logging::Logger;
use crate::mcp::{McpClient, McpError, McpResult};
use crate::protocol::{RepairLadder, FALLBACK_FIELD};
use crate::secrets::SecretStore;
use crate::types::{CancellationToken, ServerConfig, ToolCallRecord, ToolResult, ToolSchema};

/// Separator between provider id and local tool name
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Default per-dispatch timeout
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while registering providers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid provider id '{0}': must be non-empty, must not contain '__' or end with '_'")]
    InvalidProviderId(String),

    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Why a dispatch failed; rendered into an error `ToolResult`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{provider}' has no tool named '{tool}'")]
    UnknownTool { provider: String, tool: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Provider(String),

    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),

    #[error("tool call cancelled")]
    Cancelled,
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl From<McpError> for DispatchError {
    fn from(e: McpError) -> Self {
        DispatchError::Provider(e.to_string())
    }
}

/// Outcome of registering one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub provider: String,
    /// Number of tools kept
    pub registered: usize,
    /// Local names dropped because the provider listed them more than once
    pub duplicates: Vec<String>,
}

/// Outcome of connecting the configured providers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectSummary {
    pub connected: Vec<RegistrationReport>,
    /// Provider id and the reason it was skipped
    pub failed: Vec<(String, String)>,
}

struct ProviderEntry {
    id: String,
    session: Arc<dyn ToolProvider>,
    /// Tools under their local names, in listing order
    tools: Vec<ToolSchema>,
}

/// Check a provider id against the namespace rules
pub fn validate_provider_id(id: &str) -> RegistryResult<()> {
    if id.is_empty() || id.contains(NAMESPACE_SEPARATOR) || id.ends_with('_') {
        return Err(RegistryError::InvalidProviderId(id.to_string()));
    }
    Ok(())
}

/// Split a qualified name into (provider id, local name)
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAMESPACE_SEPARATOR)
}

/// Registry of provider sessions and their namespaced tools
pub struct ToolRegistry {
    providers: RwLock<Vec<ProviderEntry>>,
    ladder: RepairLadder,
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            ladder: RepairLadder::standard(),
            timeout: DEFAULT_TOOL_TIMEOUT,
            logger,
        }
    }

    /// Set the per-dispatch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a connected provider and the tools it listed
    ///
    /// A local name listed twice by the same provider keeps its first
    /// schema; later ones are dropped and reported.
    pub fn register(
        &self,
        session: Arc<dyn ToolProvider>,
        schemas: Vec<ToolSchema>,
    ) -> RegistryResult<RegistrationReport> {
        let id = session.id().to_string();
        validate_provider_id(&id)?;

        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(schemas.len());
        let mut duplicates = Vec::new();
        for schema in schemas {
            if seen.insert(schema.name.clone()) {
                tools.push(schema);
            } else {
                duplicates.push(schema.name);
            }
        }

        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.id == id) {
            return Err(RegistryError::DuplicateProvider(id));
        }

        for name in &duplicates {
            self.logger.warn(&format!(
                "[ToolRegistry] Provider '{}' listed tool '{}' more than once; keeping the first",
                id, name
            ));
        }
        self.logger.info(&format!(
            "[ToolRegistry] Registered {} tools from '{}'",
            tools.len(),
            id
        ));

        let report = RegistrationReport {
            provider: id.clone(),
            registered: tools.len(),
            duplicates,
        };
        providers.push(ProviderEntry { id, session, tools });
        Ok(report)
    }

    /// Connect every enabled server over MCP and register what connects
    pub async fn connect_all(
        &self,
        servers: &[ServerConfig],
        secrets: Arc<dyn SecretStore>,
    ) -> ConnectSummary {
        let logger = self.logger.clone();
        self.connect_with(servers, move |config| {
            let secrets = secrets.clone();
            let logger = logger.clone();
            async move {
                McpClient::connect(&config, secrets.as_ref(), logger)
                    .await
                    .map(|client| Arc::new(client) as Arc<dyn ToolProvider>)
            }
        })
        .await
    }

    /// Connect every enabled server with `connect` and register what connects
    ///
    /// A server that fails to connect, list its tools or register is logged
    /// and skipped; any session it opened is closed again.
    pub async fn connect_with<F, Fut>(&self, servers: &[ServerConfig], connect: F) -> ConnectSummary
    where
        F: Fn(ServerConfig) -> Fut,
        Fut: Future<Output = McpResult<Arc<dyn ToolProvider>>>,
    {
        let mut summary = ConnectSummary::default();

        for config in servers.iter().filter(|s| s.enabled) {
            let name = config.name.clone();
            match self.connect_one(config.clone(), &connect).await {
                Ok(report) => summary.connected.push(report),
                Err(reason) => {
                    self.logger.error(&format!(
                        "[ToolRegistry] Skipping provider '{}': {}",
                        name, reason
                    ));
                    summary.failed.push((name, reason));
                }
            }
        }

        self.logger.info(&format!(
            "[ToolRegistry] {} providers connected, {} skipped",
            summary.connected.len(),
            summary.failed.len()
        ));
        summary
    }

    async fn connect_one<F, Fut>(&self, config: ServerConfig, connect: &F) -> Result<RegistrationReport, String>
    where
        F: Fn(ServerConfig) -> Fut,
        Fut: Future<Output = McpResult<Arc<dyn ToolProvider>>>,
    {
        validate_provider_id(&config.name).map_err(|e| e.to_string())?;

        let session = connect(config).await.map_err(|e| e.to_string())?;
        let listed = match session.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                self.close_quietly(session.as_ref()).await;
                return Err(format!("listing tools failed: {}", e));
            }
        };

        match self.register(session.clone(), listed) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.close_quietly(session.as_ref()).await;
                Err(e.to_string())
            }
        }
    }

    async fn close_quietly(&self, session: &dyn ToolProvider) {
        if let Err(e) = session.close().await {
            self.logger.warn(&format!(
                "[ToolRegistry] Failed to close '{}': {}",
                session.id(),
                e
            ));
        }
    }

    /// Close every registered session
    ///
    /// Every session gets a close attempt; failures are logged. The registry
    /// is empty afterwards.
    pub async fn shutdown(&self) {
        let entries: Vec<ProviderEntry> = std::mem::take(&mut *self.providers.write());
        for entry in entries {
            self.close_quietly(entry.session.as_ref()).await;
        }
        self.logger.info("[ToolRegistry] All provider sessions closed");
    }

    /// Qualified schemas of every registered tool, in registration order
    pub fn tools(&self) -> Vec<ToolSchema> {
        self.providers
            .read()
            .iter()
            .flat_map(|p| p.tools.iter().map(|t| t.qualified(&p.id, NAMESPACE_SEPARATOR)))
            .collect()
    }

    /// Qualified names of every registered tool
    pub fn tool_names(&self) -> Vec<String> {
        self.tools().into_iter().map(|t| t.name).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.providers.read().iter().map(|p| p.tools.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_count() == 0
    }

    /// Session and local schema behind a qualified name
    fn resolve(&self, qualified: &str) -> DispatchResult<(Arc<dyn ToolProvider>, ToolSchema)> {
        let (provider_id, local) = split_qualified(qualified)
            .ok_or_else(|| DispatchError::UnknownProvider(qualified.to_string()))?;

        let providers = self.providers.read();
        let entry = providers
            .iter()
            .find(|p| p.id == provider_id)
            .ok_or_else(|| DispatchError::UnknownProvider(provider_id.to_string()))?;
        let schema = entry
            .tools
            .iter()
            .find(|t| t.name == local)
            .ok_or_else(|| DispatchError::UnknownTool {
                provider: provider_id.to_string(),
                tool: local.to_string(),
            })?;

        Ok((entry.session.clone(), schema.clone()))
    }

    /// Decode a call's argument text into a JSON object
    fn decode_arguments(&self, call: &ToolCallRecord, schema: &ToolSchema) -> DispatchResult<Value> {
        let expected = schema.parameters.expected_field().unwrap_or(FALLBACK_FIELD);
        let repaired = self
            .ladder
            .repair(&call.raw_arguments, expected)
            .map_err(|e| DispatchError::InvalidArguments(e.to_string()))?;

        if !matches!(repaired.strategy, "strict" | "empty") {
            self.logger.debug(&format!(
                "[ToolRegistry] Arguments for {} recovered by '{}'",
                call.tool_name, repaired.strategy
            ));
        }
        if !repaired.value.is_object() {
            return Err(DispatchError::InvalidArguments(
                "arguments must be a JSON object".to_string(),
            ));
        }
        Ok(repaired.value)
    }

    /// Route a call to its provider and return the result text
    pub async fn try_dispatch(
        &self,
        call: &ToolCallRecord,
        cancel: &CancellationToken,
    ) -> DispatchResult<String> {
        let (session, schema) = self.resolve(&call.tool_name)?;
        let arguments = self.decode_arguments(call, &schema)?;

        let pending = tokio::time::timeout(self.timeout, session.call_tool(&schema.name, arguments));
        let output = cancel
            .run(pending)
            .await
            .ok_or(DispatchError::Cancelled)?
            .map_err(|_| DispatchError::Timeout(self.timeout))??;

        if output.is_error {
            return Err(DispatchError::Provider(output.text));
        }
        Ok(output.text)
    }

    /// Route a call to its provider; failures become an error result
    pub async fn dispatch(&self, call: &ToolCallRecord, cancel: &CancellationToken) -> ToolResult {
        self.logger.info(&format!(
            "[ToolRegistry] Dispatching {} ({})",
            call.tool_name, call.id
        ));

        match self.try_dispatch(call, cancel).await {
            Ok(text) => ToolResult::success(&call.id, &call.tool_name, text),
            Err(e) => {
                self.logger.warn(&format!(
                    "[ToolRegistry] {} failed: {}",
                    call.tool_name, e
                ));
                ToolResult::error(&call.id, &call.tool_name, format!("Error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::tools::ToolOutput;

    /// In-process provider that echoes its arguments
    struct FakeProvider {
        id: String,
        tools: Vec<ToolSchema>,
        calls: Mutex<Vec<(String, Value)>>,
        fail_with: Option<String>,
        delay: Option<Duration>,
        closed: AtomicBool,
    }

    impl FakeProvider {
        fn new(id: &str, tools: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                tools: tools
                    .iter()
                    .map(|name| {
                        ToolSchema::new(*name, format!("{name} tool")).with_input_schema(&json!({
                            "properties": { "query": { "type": "string" } },
                            "required": ["query"]
                        }))
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
                fail_with: None,
                delay: None,
                closed: AtomicBool::new(false),
            }
        }

        fn failing(mut self, message: &str) -> Self {
            self.fail_with = Some(message.to_string());
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl ToolProvider for FakeProvider {
        fn id(&self) -> &str {
            &self.id
        }

        async fn list_tools(&self) -> McpResult<Vec<ToolSchema>> {
            Ok(self.tools.clone())
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().push((name.to_string(), arguments.clone()));
            match &self.fail_with {
                Some(message) => Err(McpError::ToolCallFailed(message.clone())),
                None => Ok(ToolOutput::text(format!("{}:{}:{}", self.id, name, arguments))),
            }
        }

        async fn close(&self) -> McpResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(NoOpLogger::new()))
    }

    fn register(registry: &ToolRegistry, provider: FakeProvider) -> Arc<FakeProvider> {
        let provider = Arc::new(provider);
        let tools = provider.tools.clone();
        registry.register(provider.clone(), tools).unwrap();
        provider
    }

    #[test]
    fn test_validate_provider_id() {
        assert!(validate_provider_id("brave_search").is_ok());
        assert!(validate_provider_id("_private").is_ok());
        for bad in ["", "a__b", "trailing_", "__"] {
            assert_eq!(
                validate_provider_id(bad),
                Err(RegistryError::InvalidProviderId(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_split_qualified_uses_first_separator() {
        assert_eq!(split_qualified("github__search__issues"), Some(("github", "search__issues")));
        assert_eq!(split_qualified("fs___hidden"), Some(("fs", "_hidden")));
        assert_eq!(split_qualified("plain"), None);
    }

    #[tokio::test]
    async fn test_same_tool_name_on_two_providers() {
        let registry = registry();
        register(&registry, FakeProvider::new("web", &["search"]));
        register(&registry, FakeProvider::new("docs", &["search"]));

        assert_eq!(registry.tool_names(), vec!["web__search", "docs__search"]);

        let cancel = CancellationToken::new();
        let web = registry
            .dispatch(&ToolCallRecord::new("call_0", "web__search", r#"{"query":"x"}"#), &cancel)
            .await;
        let docs = registry
            .dispatch(&ToolCallRecord::new("call_1", "docs__search", r#"{"query":"y"}"#), &cancel)
            .await;

        assert!(!web.is_error);
        assert!(web.content.starts_with("web:search:"));
        assert!(docs.content.starts_with("docs:search:"));
        assert_eq!(docs.call_id, "call_1");
    }

    #[tokio::test]
    async fn test_duplicate_local_names_keep_first() {
        let logger = Arc::new(MemoryLogger::new());
        let registry = ToolRegistry::new(logger.clone());
        let provider = Arc::new(FakeProvider::new("fs", &[]));
        let schemas = vec![
            ToolSchema::new("read", "first"),
            ToolSchema::new("write", "w"),
            ToolSchema::new("read", "second"),
        ];

        let report = registry.register(provider, schemas).unwrap();
        assert_eq!(report.registered, 2);
        assert_eq!(report.duplicates, vec!["read".to_string()]);
        assert_eq!(registry.tools()[0].description, "first");
        assert!(logger.contains(LogLevel::Warn, "'read' more than once"));
    }

    #[test]
    fn test_register_rejects_bad_and_duplicate_ids() {
        let registry = registry();
        let bad = Arc::new(FakeProvider::new("a__b", &["x"]));
        assert!(matches!(
            registry.register(bad, vec![]),
            Err(RegistryError::InvalidProviderId(_))
        ));

        register(&registry, FakeProvider::new("fs", &["read"]));
        let again = Arc::new(FakeProvider::new("fs", &["write"]));
        assert_eq!(
            registry.register(again, vec![]),
            Err(RegistryError::DuplicateProvider("fs".to_string()))
        );
        assert_eq!(registry.tool_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_provider_and_tool() {
        let registry = registry();
        register(&registry, FakeProvider::new("fs", &["read"]));
        let cancel = CancellationToken::new();

        let result = registry
            .dispatch(&ToolCallRecord::new("call_0", "nope__read", "{}"), &cancel)
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "Error: unknown provider 'nope'");

        let result = registry
            .dispatch(&ToolCallRecord::new("call_0", "unqualified", "{}"), &cancel)
            .await;
        assert!(result.is_error);

        assert_eq!(
            registry
                .try_dispatch(&ToolCallRecord::new("call_0", "fs__delete", "{}"), &cancel)
                .await,
            Err(DispatchError::UnknownTool {
                provider: "fs".to_string(),
                tool: "delete".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_result() {
        let registry = registry();
        register(&registry, FakeProvider::new("net", &["fetch"]).failing("connection reset"));

        let result = registry
            .dispatch(
                &ToolCallRecord::new("call_0", "net__fetch", r#"{"query":"x"}"#),
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_arguments_are_repaired_before_dispatch() {
        let registry = registry();
        let provider = register(&registry, FakeProvider::new("web", &["search"]));
        let cancel = CancellationToken::new();

        registry
            .dispatch(&ToolCallRecord::new("call_0", "web__search", r#"{"query": "rust", oops"#), &cancel)
            .await;
        registry
            .dispatch(&ToolCallRecord::new("call_1", "web__search", ""), &cancel)
            .await;

        let calls = provider.calls.lock().clone();
        assert_eq!(calls[0], ("search".to_string(), json!({"query": "rust"})));
        assert_eq!(calls[1], ("search".to_string(), json!({})));
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let registry = registry();
        let provider = register(&registry, FakeProvider::new("web", &["search"]));

        let err = registry
            .try_dispatch(
                &ToolCallRecord::new("call_0", "web__search", "[1, 2]"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_timeout() {
        let registry = registry().with_timeout(Duration::from_millis(20));
        register(&registry, FakeProvider::new("slow", &["wait"]).slow(Duration::from_secs(5)));

        let err = registry
            .try_dispatch(&ToolCallRecord::new("call_0", "slow__wait", "{}"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_dispatch_cancelled() {
        let registry = registry();
        register(&registry, FakeProvider::new("slow", &["wait"]).slow(Duration::from_secs(5)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = registry
            .try_dispatch(&ToolCallRecord::new("call_0", "slow__wait", "{}"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Cancelled);
    }

    #[tokio::test]
    async fn test_connect_with_skips_failures_and_shutdown_closes_all() {
        let registry = registry();
        let opened: Arc<Mutex<Vec<Arc<FakeProvider>>>> = Arc::new(Mutex::new(Vec::new()));
        let servers = vec![
            ServerConfig::stdio("fs", "fake", ["fs"]),
            ServerConfig::stdio("down", "fake", ["down"]),
            ServerConfig::stdio("bad__id", "fake", ["x"]),
            ServerConfig::stdio("off", "fake", ["off"]).disabled(),
            ServerConfig::http("web", "http://fake"),
        ];

        let sink = opened.clone();
        let summary = registry
            .connect_with(&servers, move |config| {
                let sink = sink.clone();
                async move {
                    if config.name == "down" {
                        return Err(McpError::ConnectionFailed("refused".to_string()));
                    }
                    let provider = Arc::new(FakeProvider::new(&config.name, &["a", "b"]));
                    sink.lock().push(provider.clone());
                    Ok(provider as Arc<dyn ToolProvider>)
                }
            })
            .await;

        let connected: Vec<_> = summary.connected.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(connected, vec!["fs", "web"]);
        let failed: Vec<_> = summary.failed.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(failed, vec!["down", "bad__id"]);
        assert_eq!(registry.tool_count(), 4);

        registry.shutdown().await;
        assert!(registry.is_empty());
        assert!(opened
            .lock()
            .iter()
            .all(|p| p.closed.load(Ordering::SeqCst)));
    }
}
