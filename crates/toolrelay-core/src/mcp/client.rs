//! MCP Client using the official rmcp SDK

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation, RawContent, Tool},
    service::RunningService,
    transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::RwLock;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::logging::Logger;
use crate::secrets::{expand_placeholders, SecretStore};
use crate::tools::{ToolOutput, ToolProvider};
use crate::types::{ServerConfig, ServerTransport, ToolSchema};

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session closed")]
    Closed,
}

pub type McpResult<T> = Result<T, McpError>;

type Session = RunningService<RoleClient, ClientInfo>;

/// MCP client session for one configured tool server
pub struct McpClient {
    id: String,
    /// `None` once closed
    session: RwLock<Option<Session>>,
    logger: Arc<dyn Logger>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolrelay".to_string(),
            title: Some("toolrelay".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpClient {
    /// Connect using whichever transport `config` names
    pub async fn connect(
        config: &ServerConfig,
        secrets: &dyn SecretStore,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        match &config.transport {
            ServerTransport::Stdio { command, args, env } => {
                let env = resolve_env(env, secrets)?;
                Self::connect_stdio(&config.name, command, args, &env, logger).await
            }
            ServerTransport::Http { url } => Self::connect_http(&config.name, url, logger).await,
            ServerTransport::Unix { path } => Self::connect_unix(&config.name, path, logger).await,
        }
    }

    /// Spawn `command` and speak MCP over its stdio
    pub async fn connect_stdio(
        id: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!(
            "[McpClient] Launching '{}': {} {}",
            id,
            command,
            args.join(" ")
        ));

        let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
            cmd.args(args).envs(env);
        }))
        .map_err(|e| McpError::ConnectionFailed(format!("failed to spawn {}: {}", command, e)))?;

        let session = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::ready(id, session, logger))
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(id: &str, url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Connecting '{}' over HTTP: {}", id, url));

        let transport = StreamableHttpClientTransport::from_uri(url);
        let session = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::ready(id, session, logger))
    }

    /// Connect to an MCP server over a Unix socket
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<Path>>(
        id: &str,
        socket_path: P,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let path = socket_path.as_ref();
        logger.info(&format!("[McpClient] Connecting '{}' to Unix socket: {:?}", id, path));

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let session = client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::ready(id, session, logger))
    }

    #[cfg(not(unix))]
    pub async fn connect_unix<P: AsRef<Path>>(
        id: &str,
        socket_path: P,
        _logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        Err(McpError::ConnectionFailed(format!(
            "'{}': Unix sockets are not supported on this platform ({:?})",
            id,
            socket_path.as_ref()
        )))
    }

    fn ready(id: &str, session: Session, logger: Arc<dyn Logger>) -> Self {
        match session.peer_info() {
            Some(info) => logger.info(&format!(
                "[McpClient] '{}' initialized: {} {}",
                id, info.server_info.name, info.server_info.version
            )),
            None => logger.info(&format!("[McpClient] '{}' initialized", id)),
        }

        Self {
            id: id.to_string(),
            session: RwLock::new(Some(session)),
            logger,
        }
    }
}

/// Resolve `${VAR}` placeholders in a server's environment
fn resolve_env(
    env: &BTreeMap<String, String>,
    secrets: &dyn SecretStore,
) -> McpResult<BTreeMap<String, String>> {
    env.iter()
        .map(|(key, value)| {
            expand_placeholders(secrets, value)
                .map(|resolved| (key.clone(), resolved))
                .map_err(|e| McpError::ConnectionFailed(format!("env {}: {}", key, e)))
        })
        .collect()
}

fn to_schema(tool: Tool) -> ToolSchema {
    let input_schema = Value::Object(tool.input_schema.as_ref().clone());
    ToolSchema::new(
        tool.name.to_string(),
        tool.description.map(|s| s.to_string()).unwrap_or_default(),
    )
    .with_input_schema(&input_schema)
}

#[async_trait]
impl ToolProvider for McpClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolSchema>> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(McpError::Closed)?;

        let result = session
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[McpClient] '{}' listed {} tools",
            self.id,
            result.tools.len()
        ));

        Ok(result.tools.into_iter().map(to_schema).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(McpError::Closed)?;

        self.logger
            .debug(&format!("[McpClient] '{}' calling tool: {}", self.id, name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = session
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        // Content is Annotated<RawContent>; only text parts reach the model
        let text = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolOutput {
            text,
            is_error: result.is_error.unwrap_or(false),
        })
    }

    async fn close(&self) -> McpResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        self.logger
            .info(&format!("[McpClient] Closing '{}'", self.id));
        session
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}
