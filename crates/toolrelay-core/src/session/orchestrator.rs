//! Turn orchestrator
//!
//! Drives one turn: send the history, dispatch any tool calls the backend
//! asks for, append their results and send again, until a plain answer
//! comes back or the turn is aborted.

use std::sync::Arc;

use thiserror::Error;

use super::conversation::Conversation;
use super::state::TurnState;
use crate::backends::{BackendError, BackendReply, CompletionBackend};
use crate::logging::Logger;
use crate::tools::ToolRegistry;
use crate::types::{CancellationToken, ToolCallRecord, ToolResult, TurnSettings};
use crate::{log_debug, log_info, log_warn};

/// Why a turn ended without a plain answer
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("backend request failed: {0}")]
    Transport(BackendError),

    #[error("turn limit of {limit} backend requests exceeded")]
    TurnLimitExceeded { limit: usize },

    #[error("turn cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub enum TurnEnd {
    Done,
    Aborted(TurnError),
}

/// What a turn produced
///
/// The answer is always set: on abort it is the error text.
#[derive(Debug)]
pub struct TurnOutcome {
    pub answer: String,
    pub end: TurnEnd,
    /// Calls dispatched during the turn, in order
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TurnOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.end, TurnEnd::Done)
    }

    pub fn error(&self) -> Option<&TurnError> {
        match &self.end {
            TurnEnd::Done => None,
            TurnEnd::Aborted(e) => Some(e),
        }
    }
}

/// Runs turns against one backend and a shared tool registry
pub struct TurnOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    registry: Arc<ToolRegistry>,
    settings: TurnSettings,
    logger: Arc<dyn Logger>,
}

impl TurnOrchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        registry: Arc<ToolRegistry>,
        settings: TurnSettings,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            backend,
            registry,
            settings,
            logger,
        }
    }

    /// Swap the backend used by later turns; conversations are unaffected
    pub fn set_backend(&mut self, backend: Arc<dyn CompletionBackend>) {
        log_info!(
            self.logger,
            "[Orchestrator] Switching backend {} -> {}",
            self.backend.name(),
            backend.name()
        );
        self.backend = backend;
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn transition(&self, conversation: &mut Conversation, next: TurnState) {
        let current = conversation.state();
        if !current.can_transition_to(next) {
            log_warn!(
                self.logger,
                "[Orchestrator] Unexpected transition {} -> {}",
                current,
                next
            );
        }
        log_debug!(self.logger, "[Orchestrator] {} -> {}", current, next);
        conversation.set_state(next);
    }

    fn abort(
        &self,
        conversation: &mut Conversation,
        error: TurnError,
        tool_calls: Vec<ToolCallRecord>,
    ) -> TurnOutcome {
        log_warn!(self.logger, "[Orchestrator] Turn aborted: {}", error);
        if !conversation.state().is_idle() {
            self.transition(conversation, TurnState::Aborted);
        }
        TurnOutcome {
            answer: format!("Error: {}", error),
            end: TurnEnd::Aborted(error),
            tool_calls,
        }
    }

    /// Run one turn for `query`
    ///
    /// Never fails: transport errors, the turn limit and cancellation end
    /// the turn with `TurnEnd::Aborted` and the error as the answer text.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        query: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        if cancel.is_cancelled() {
            return self.abort(conversation, TurnError::Cancelled, Vec::new());
        }

        conversation.push_user(query);
        if let Some(max) = self.settings.max_history {
            let dropped = conversation.apply_window(max);
            if dropped > 0 {
                log_info!(
                    self.logger,
                    "[Orchestrator] Dropped {} old messages to fit the history window",
                    dropped
                );
            }
        }

        let tools = self.registry.tools();
        let limit = self.settings.max_iterations;
        let mut dispatched = Vec::new();

        for iteration in 0..limit {
            let sent = if iteration == 0 {
                TurnState::RequestSent
            } else {
                TurnState::FollowUpSent
            };
            self.transition(conversation, sent);

            let reply = match self
                .backend
                .complete(conversation.messages(), &tools, cancel)
                .await
            {
                Ok(reply) => reply,
                Err(BackendError::Cancelled) => {
                    return self.abort(conversation, TurnError::Cancelled, dispatched)
                }
                Err(e) => return self.abort(conversation, TurnError::Transport(e), dispatched),
            };

            match reply {
                BackendReply::Answer(text) => {
                    self.transition(conversation, TurnState::PlainAnswer);
                    conversation.push_answer(text.clone());
                    self.transition(conversation, TurnState::Done);
                    return TurnOutcome {
                        answer: text,
                        end: TurnEnd::Done,
                        tool_calls: dispatched,
                    };
                }
                BackendReply::ToolCalls { preamble, calls } => {
                    self.transition(conversation, TurnState::ToolCallsDetected);
                    log_info!(
                        self.logger,
                        "[Orchestrator] Request {} asked for {} tool calls",
                        iteration + 1,
                        calls.len()
                    );
                    conversation.push_tool_calls(preamble, calls.clone());

                    // No request is left to report results, so nothing runs
                    if iteration + 1 == limit {
                        log_warn!(
                            self.logger,
                            "[Orchestrator] Turn limit of {} reached; not running {} tool calls",
                            limit,
                            calls.len()
                        );
                        self.skip_all(
                            conversation,
                            &calls,
                            "Error: tool call not run, turn limit reached",
                        );
                        break;
                    }

                    self.transition(conversation, TurnState::ToolsExecuting);
                    let cancelled = self.execute(conversation, &calls, cancel).await;
                    dispatched.extend(calls);
                    if cancelled {
                        return self.abort(conversation, TurnError::Cancelled, dispatched);
                    }
                }
            }
        }

        self.abort(conversation, TurnError::TurnLimitExceeded { limit }, dispatched)
    }

    /// Dispatch `calls` one at a time, in order, appending each result
    ///
    /// Returns true if the turn was cancelled. Calls left unrun get a
    /// cancelled result so the history stays complete.
    async fn execute(
        &self,
        conversation: &mut Conversation,
        calls: &[ToolCallRecord],
        cancel: &CancellationToken,
    ) -> bool {
        for call in calls {
            let result = if cancel.is_cancelled() {
                ToolResult::error(&call.id, &call.tool_name, "Error: tool call cancelled")
            } else {
                self.registry.dispatch(call, cancel).await
            };
            self.record(conversation, result);
        }
        cancel.is_cancelled()
    }

    /// Close every call in `calls` with an error result without running it
    fn skip_all(&self, conversation: &mut Conversation, calls: &[ToolCallRecord], reason: &str) {
        for call in calls {
            self.record(conversation, ToolResult::error(&call.id, &call.tool_name, reason));
        }
    }

    fn record(&self, conversation: &mut Conversation, result: ToolResult) {
        if let Err(e) = conversation.push_tool_result(result) {
            log_warn!(self.logger, "[Orchestrator] Dropping tool result: {}", e);
        }
    }
}
