//! Mock transport for testing
//!
//! Deterministic, scripted completions without network access. Used by the
//! orchestrator tests and the integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{BackendError, BackendResult};
use super::traits::{CompletionRequest, CompletionTransport};
use crate::logging::Logger;

/// One scripted response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    /// Return this completion text
    Reply(String),
    /// Fail as a non-200 response would
    Fail { status: u16, message: String },
}

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return the same text for every request
    Fixed(String),
    /// Play steps in order; fail once they run out
    Scripted(VecDeque<MockStep>),
    /// Fail every request
    Error(String),
}

/// Transport that answers from a script and records every request
pub struct MockTransport {
    mode: Mutex<MockMode>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockTransport {
    pub fn with_mode(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        Self {
            mode: Mutex::new(mode),
            delay: None,
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create an echo transport (echoes back the last user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Echo, logger)
    }

    /// Create a fixed response transport
    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Fixed(response.into()), logger)
    }

    /// Create a transport replying with `replies` in order
    pub fn scripted<I, S>(replies: I, logger: Arc<dyn Logger>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = replies.into_iter().map(|r| MockStep::Reply(r.into())).collect();
        Self::with_mode(MockMode::Scripted(steps), logger)
    }

    /// Create a transport playing `steps` in order
    pub fn steps(steps: impl IntoIterator<Item = MockStep>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Scripted(steps.into_iter().collect()), logger)
    }

    /// Create an error-producing transport
    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Error(message.into()), logger)
    }

    /// Wait this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_step(&self, request: &CompletionRequest) -> MockStep {
        let mut mode = self.mode.lock();
        match &mut *mode {
            MockMode::Echo => MockStep::Reply(
                request
                    .last_user_content()
                    .unwrap_or("Hello from MockTransport!")
                    .to_string(),
            ),
            MockMode::Fixed(text) => MockStep::Reply(text.clone()),
            MockMode::Scripted(steps) => steps.pop_front().unwrap_or_else(|| MockStep::Fail {
                status: 500,
                message: "mock script exhausted".to_string(),
            }),
            MockMode::Error(message) => MockStep::Fail {
                status: 500,
                message: message.clone(),
            },
        }
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: &CompletionRequest) -> BackendResult<String> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_step(request) {
            MockStep::Reply(text) => {
                self.logger.debug(&format!("[MockTransport] Replying with {} chars", text.len()));
                Ok(text)
            }
            MockStep::Fail { status, message } => {
                self.logger.debug(&format!("[MockTransport] Failing with {}", status));
                Err(BackendError::api_error("mock", status, message))
            }
        }
    }
}
