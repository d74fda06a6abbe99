//! Per-conversation history

use std::collections::HashSet;

use thiserror::Error;

use super::state::TurnState;
use crate::types::{ConversationMessage, ToolCallRecord, ToolResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The result does not answer a call of the immediately preceding
    /// assistant message, or that call was already answered
    #[error("tool result '{call_id}' has no open call")]
    OrphanToolResult { call_id: String },
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// One conversation: its history and the state of its current turn
///
/// All appends go through methods that keep the history well ordered: a
/// tool result must answer a call of the assistant message right before it.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    /// Call ids of the latest assistant message still waiting for a result
    open_calls: HashSet<String>,
    state: TurnState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a leading system message
    pub fn with_system(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ConversationMessage::system(text)],
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TurnState) {
        self.state = state;
    }

    fn has_leading_system(&self) -> bool {
        self.messages.first().is_some_and(ConversationMessage::is_system)
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.open_calls.clear();
        self.messages.push(ConversationMessage::user(text));
    }

    /// Append a plain assistant answer
    pub fn push_answer(&mut self, text: impl Into<String>) {
        self.open_calls.clear();
        self.messages.push(ConversationMessage::assistant(text));
    }

    /// Append an assistant message issuing `calls`
    pub fn push_tool_calls(&mut self, preamble: impl Into<String>, calls: Vec<ToolCallRecord>) {
        self.open_calls = calls.iter().map(|c| c.id.clone()).collect();
        self.messages
            .push(ConversationMessage::assistant_with_calls(preamble, calls));
    }

    /// Append the result of one of the latest assistant message's calls
    pub fn push_tool_result(&mut self, result: ToolResult) -> HistoryResult<()> {
        if !self.open_calls.remove(&result.call_id) {
            return Err(HistoryError::OrphanToolResult {
                call_id: result.call_id,
            });
        }
        self.messages.push(ConversationMessage::tool_result(result));
        Ok(())
    }

    /// Drop everything except the leading system message
    pub fn clear(&mut self) {
        let keep = usize::from(self.has_leading_system());
        self.messages.truncate(keep);
        self.open_calls.clear();
        self.state = TurnState::AwaitingInput;
    }

    /// Trim the history to at most `max` messages after the system message
    ///
    /// Cuts only in front of a user message so no tool result loses its
    /// call. If no such cut fits, everything before the latest user message
    /// goes. Returns the number of messages dropped.
    pub fn apply_window(&mut self, max: usize) -> usize {
        let start = usize::from(self.has_leading_system());
        let body_len = self.messages.len() - start;
        if body_len <= max {
            return 0;
        }

        let user_positions: Vec<usize> = self.messages[start..]
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_user())
            .map(|(i, _)| i)
            .collect();

        let cut = user_positions
            .iter()
            .copied()
            .find(|&i| body_len - i <= max)
            .or_else(|| user_positions.last().copied());

        match cut {
            Some(cut) if cut > 0 => {
                self.messages.drain(start..start + cut);
                cut
            }
            _ => 0,
        }
    }
}
