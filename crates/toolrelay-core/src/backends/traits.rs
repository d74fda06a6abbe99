//! Completion backend traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::BackendResult;
use crate::types::{CancellationToken, ChatMessage, ConversationMessage, ToolCallRecord, ToolSchema};

/// Body of an OpenAI-compatible `chat/completions` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Last user message content, if any
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::types::MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Sends a request and returns the raw completion text
///
/// The transport is stateless: every request carries the full context.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Name used in errors and logs
    fn name(&self) -> &str;

    async fn send(&self, request: &CompletionRequest) -> BackendResult<String>;
}

/// What a backend made of one completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    /// A plain answer; the turn is over
    Answer(String),
    /// Tool calls to dispatch before asking again
    ToolCalls {
        preamble: String,
        calls: Vec<ToolCallRecord>,
    },
}

/// A completion backend as seen by the turn orchestrator
///
/// Implementations:
/// - `TextSentinelBackend`: tool calls travel as sentinel-framed text
/// - `StructuredBackend`: native function calling
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name (e.g., "chutes", "openrouter")
    fn name(&self) -> &str;

    /// Request one completion for `history` with `tools` on offer
    ///
    /// Returns `BackendError::Cancelled` if `cancel` fires first.
    async fn complete(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> BackendResult<BackendReply>;
}
