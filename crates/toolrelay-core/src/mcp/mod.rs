//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool servers. Supports child
//! processes over stdio, Streamable HTTP and Unix sockets.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolrelay_core::mcp::McpClient;
//! use toolrelay_core::tools::ToolProvider;
//!
//! let server = ServerConfig::stdio("fs", "npx", ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]);
//! let client = McpClient::connect(&server, &EnvSecretStore::new(), logger).await?;
//!
//! let tools = client.list_tools().await?;
//! let output = client.call_tool("read_file", json!({ "path": "/tmp/notes.txt" })).await?;
//! client.close().await?;
//! ```

mod client;

pub use client::{McpClient, McpError, McpResult};
