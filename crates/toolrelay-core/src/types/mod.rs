//! Core types shared by the protocol engine
//!
//! This module contains the conversation model, tool schemas and call records,
//! and the configuration shapes for backends and tool servers.

mod message;
mod settings;
mod tool;
mod cancellation;

pub use message::{ChatMessage, ConversationMessage, MessageRole};
pub use settings::{
    BackendConfig, BackendKind, ServerConfig, ServerTransport, TurnSettings,
};
pub use tool::{CallKind, ParameterSchema, ToolCallRecord, ToolResult, ToolSchema};
pub use cancellation::CancellationToken;
