//! Tool provider abstraction

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::McpResult;
use crate::types::ToolSchema;

/// Text returned by a provider for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// Set when the provider reports the call itself failed
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A connected tool provider session
///
/// Implementations:
/// - `McpClient`: MCP server over stdio, Streamable HTTP or a Unix socket
/// - In-process fakes in tests
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider id; the namespace prefix of every tool it exposes
    fn id(&self) -> &str;

    /// Tools exposed by the provider, under their local names
    async fn list_tools(&self) -> McpResult<Vec<ToolSchema>>;

    /// Invoke a tool by its local name
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput>;

    /// Tear down the session
    async fn close(&self) -> McpResult<()>;
}
