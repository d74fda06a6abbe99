//! Conversation message types

use serde::{Deserialize, Serialize};

use super::tool::{ToolCallRecord, ToolResult};

/// Message role on the wire to the completion backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A flat `{role, content}` message as sent in a chat/completions request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender
    pub role: MessageRole,
    /// Text content, with any sentinel framing already applied
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One entry in a conversation history
///
/// The history is an ordered sequence of these. Ordering rules (a tool result
/// always follows the assistant message that issued its call) are enforced by
/// [`crate::session::Conversation`], not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationMessage {
    System {
        text: String,
    },
    User {
        text: String,
    },
    Assistant {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRecord>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        text: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ConversationMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Plain assistant answer with no tool calls
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Assistant message carrying a preamble and an ordered batch of calls
    pub fn assistant_with_calls(preamble: impl Into<String>, calls: Vec<ToolCallRecord>) -> Self {
        Self::Assistant {
            text: preamble.into(),
            tool_calls: calls,
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self::ToolResult {
            call_id: result.call_id,
            tool_name: result.tool_name,
            text: result.content,
            is_error: result.is_error,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// The text body of the message
    pub fn text(&self) -> &str {
        match self {
            Self::System { text }
            | Self::User { text }
            | Self::Assistant { text, .. }
            | Self::ToolResult { text, .. } => text,
        }
    }

    /// Tool calls issued by this message (empty for everything but assistant calls)
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
