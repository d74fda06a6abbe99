//! Text-only backend speaking the sentinel protocol
//!
//! The history and tool catalogue are rendered into sentinel-framed text by
//! the [`PromptFormatter`]; the completion is scanned by the
//! [`SentinelParser`].

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{BackendError, BackendResult};
use super::traits::{BackendReply, CompletionBackend, CompletionRequest, CompletionTransport};
use crate::logging::Logger;
use crate::protocol::{ParseOutcome, PromptFormatter, SentinelParser};
use crate::types::{BackendConfig, CancellationToken, ConversationMessage, ToolSchema};

pub struct TextSentinelBackend {
    name: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    formatter: PromptFormatter,
    parser: SentinelParser,
    transport: Arc<dyn CompletionTransport>,
    logger: Arc<dyn Logger>,
}

impl TextSentinelBackend {
    pub fn new(
        config: &BackendConfig,
        formatter: PromptFormatter,
        transport: Arc<dyn CompletionTransport>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            formatter,
            parser: SentinelParser::new(logger.clone()),
            transport,
            logger,
        }
    }

    /// The request that would be sent for `history` and `tools`
    pub fn build_request(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolSchema],
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: self.formatter.format(history, tools),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl CompletionBackend for TextSentinelBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> BackendResult<BackendReply> {
        let request = self.build_request(history, tools);
        self.logger.debug(&format!(
            "[TextSentinelBackend] Sending {} messages with {} tools to {}",
            request.messages.len(),
            tools.len(),
            self.transport.name()
        ));

        let text = cancel
            .run(self.transport.send(&request))
            .await
            .ok_or(BackendError::Cancelled)??;

        Ok(match self.parser.parse(&text) {
            ParseOutcome::PlainAnswer(answer) => BackendReply::Answer(answer),
            ParseOutcome::ToolCallBatch {
                preamble, calls, ..
            } => {
                self.logger.info(&format!(
                    "[TextSentinelBackend] Completion carried {} tool calls",
                    calls.len()
                ));
                BackendReply::ToolCalls { preamble, calls }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockTransport;
    use crate::logging::NoOpLogger;
    use crate::protocol::sentinels::{CALLS_BEGIN, CALLS_END, CALL_BEGIN, CALL_END, CALL_SEPARATOR};
    use std::time::Duration;

    fn backend(transport: Arc<MockTransport>) -> TextSentinelBackend {
        TextSentinelBackend::new(
            &BackendConfig::chutes(),
            PromptFormatter::default(),
            transport,
            Arc::new(NoOpLogger),
        )
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let transport = Arc::new(MockTransport::fixed(
            "It is sunny.<｜end▁of▁sentence｜>",
            Arc::new(NoOpLogger),
        ));
        let backend = backend(transport.clone());

        let reply = backend
            .complete(&[ConversationMessage::user("weather?")], &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, BackendReply::Answer("It is sunny.".into()));

        let request = &transport.requests()[0];
        assert_eq!(request.model, "deepseek-ai/DeepSeek-V3-0324");
        assert_eq!(request.max_tokens, 2000);
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let completion = format!(
            "Let me look.{CALLS_BEGIN}{CALL_BEGIN}function{CALL_SEPARATOR}fs__read\n```json\n{{\"path\":\"a\"}}\n```{CALL_END}{CALLS_END}"
        );
        let transport = Arc::new(MockTransport::fixed(completion, Arc::new(NoOpLogger)));
        let backend = backend(transport);

        let reply = backend
            .complete(&[ConversationMessage::user("read a")], &[], &CancellationToken::new())
            .await
            .unwrap();
        match reply {
            BackendReply::ToolCalls { preamble, calls } => {
                assert_eq!(preamble, "Let me look.");
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].tool_name, "fs__read");
                assert_eq!(calls[0].raw_arguments, r#"{"path":"a"}"#);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = Arc::new(MockTransport::error("bad gateway", Arc::new(NoOpLogger)));
        let err = backend(transport)
            .complete(&[ConversationMessage::user("x")], &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ApiError { .. }));
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let transport = Arc::new(
            MockTransport::fixed("late", Arc::new(NoOpLogger)).with_delay(Duration::from_secs(60)),
        );
        let backend = backend(transport);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = backend
            .complete(&[ConversationMessage::user("x")], &[], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Cancelled));
    }
}
