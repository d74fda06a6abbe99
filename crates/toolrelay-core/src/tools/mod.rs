//! Tool providers, registry and dispatch
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ToolRegistry                                │
//! │                                              │
//! │  fs__read_file ──────┐                       │
//! │  fs__write_file ─────┼──► McpClient "fs"     │──► npx server-filesystem
//! │  brave_search__web ──┼──► McpClient "brave…" │──► npx server-brave-search
//! │  github__search ─────┘──► McpClient "github" │──► npx server-github
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Dispatch never fails: unknown names, bad arguments, provider errors,
//! timeouts and cancellation all come back as an error `ToolResult` the
//! model can read on its next request.

mod provider;
mod registry;

pub use provider::{ToolOutput, ToolProvider};
pub use registry::{
    split_qualified, validate_provider_id, ConnectSummary, DispatchError, DispatchResult,
    RegistrationReport, RegistryError, RegistryResult, ToolRegistry, DEFAULT_TOOL_TIMEOUT,
    NAMESPACE_SEPARATOR,
};
