//! toolrelay Core
//!
//! Tool calling for completion backends that have no structured
//! function-calling channel. Tool calls are encoded as sentinel-framed text,
//! parsed back out of completions and dispatched to MCP tool servers.
//! This crate provides the engine; the `toolrelay` CLI is a thin front end.
//!
//! ## Turn loop
//!
//! ```rust,ignore
//! use toolrelay_core::{Conversation, ToolRegistry, TurnOrchestrator};
//!
//! let registry = Arc::new(ToolRegistry::new(logger.clone()));
//! registry.connect_all(&config.servers, secrets.clone()).await;
//!
//! let backend = create_backend(config.backend("chutes")?, secrets.as_ref(), None, logger.clone())?;
//! let orchestrator = TurnOrchestrator::new(backend, registry.clone(), config.turn.clone(), logger);
//!
//! let mut conversation = Conversation::new();
//! let outcome = orchestrator.run_turn(&mut conversation, "What's in /tmp?", &cancel).await;
//! println!("{}", outcome.answer);
//!
//! registry.shutdown().await;
//! ```

pub mod backends;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod protocol;
pub mod secrets;
pub mod session;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    BackendConfig, BackendKind, CallKind, CancellationToken, ChatMessage, ConversationMessage,
    MessageRole, ParameterSchema, ServerConfig, ServerTransport, ToolCallRecord, ToolResult,
    ToolSchema, TurnSettings,
};

pub use backends::{
    create_backend, BackendError, BackendReply, BackendResult, CompletionBackend,
    StructuredBackend, TextSentinelBackend,
};

pub use protocol::{parse_completion, ParseOutcome, PromptFormatter, RepairLadder, SentinelParser};

pub use session::{Conversation, TurnEnd, TurnError, TurnOrchestrator, TurnOutcome, TurnState};

pub use tools::{DispatchError, ToolOutput, ToolProvider, ToolRegistry};

pub use mcp::{McpClient, McpError, McpResult};

pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError};

pub use logging::{Logger, NoOpLogger, TracingLogger};

pub use config::{ConfigFile, FileConfigProvider};
