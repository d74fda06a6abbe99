//! Native function-calling backend built on genai
//!
//! Tool calls arrive structured, so the sentinel parser is never involved.
//! The endpoint is treated as OpenAI-compatible and auth comes from the key
//! resolved at construction, not from genai's own env var lookup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest, ChatStreamEvent,
    Tool as GenaiTool, ToolCall as GenaiToolCall,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};

use super::error::{BackendError, BackendResult};
use super::traits::{BackendReply, CompletionBackend};
use crate::logging::Logger;
use crate::types::{
    BackendConfig, CancellationToken, ConversationMessage, ToolCallRecord, ToolSchema,
};

// ============================================================================
// Conversion: toolrelay -> genai
// ============================================================================

/// Convert one history entry to a genai message
///
/// Tool calls and results are rendered as text, so batch-local call ids never
/// need to line up with the provider's own id scheme.
pub fn to_genai_message(msg: &ConversationMessage) -> GenaiMessage {
    match msg {
        ConversationMessage::System { text } => GenaiMessage::system(text.as_str()),
        ConversationMessage::User { text } => GenaiMessage::user(text.as_str()),
        ConversationMessage::Assistant { text, tool_calls } => {
            let mut lines: Vec<String> = Vec::new();
            if !text.is_empty() {
                lines.push(text.clone());
            }
            for call in tool_calls {
                lines.push(format!("[Called {} with {}]", call.tool_name, call.raw_arguments));
            }
            GenaiMessage::assistant(lines.join("\n"))
        }
        ConversationMessage::ToolResult {
            tool_name, text, ..
        } => GenaiMessage::user(format!("[Tool result for {}]: {}", tool_name, text)),
    }
}

pub fn to_genai_messages(history: &[ConversationMessage]) -> Vec<GenaiMessage> {
    history.iter().map(to_genai_message).collect()
}

pub fn to_genai_tool(tool: &ToolSchema) -> GenaiTool {
    GenaiTool::new(tool.name.as_str())
        .with_description(tool.description.as_str())
        .with_schema(tool.parameters.to_json())
}

fn to_genai_options(config: &BackendConfig) -> GenaiOptions {
    let mut options = GenaiOptions::default()
        .with_max_tokens(config.max_tokens)
        .with_capture_tool_calls(true);
    if let Some(temperature) = config.temperature {
        options = options.with_temperature(temperature as f64);
    }
    options
}

/// Convert a genai tool call; the id is the call's position in the batch
pub fn from_genai_tool_call(index: usize, tc: &GenaiToolCall) -> ToolCallRecord {
    call_record(index, &tc.fn_name, &tc.fn_arguments)
}

fn call_record(index: usize, name: &str, arguments: &serde_json::Value) -> ToolCallRecord {
    ToolCallRecord::new(ToolCallRecord::ordinal_id(index), name, arguments.to_string())
}

// ============================================================================
// Client creation
// ============================================================================

/// genai client routed to `endpoint` with a fixed key
fn create_client(endpoint: &str, api_key: Option<String>) -> Client {
    let auth_resolver = AuthResolver::from_resolver_fn(
        move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
            Ok(api_key.clone().map(AuthData::from_single))
        },
    );

    // genai joins paths onto the endpoint, so it needs the trailing slash
    let endpoint = format!("{}/", endpoint.trim_end_matches('/'));
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { model, auth, .. } = target;
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(endpoint.clone()),
                auth,
                model: ModelIden::new(AdapterKind::OpenAI, model.model_name),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

// ============================================================================
// Backend
// ============================================================================

pub struct StructuredBackend {
    config: BackendConfig,
    client: Client,
    logger: Arc<dyn Logger>,
}

impl StructuredBackend {
    pub fn new(config: &BackendConfig, api_key: Option<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            client: create_client(&config.endpoint, api_key),
            config: config.clone(),
            logger,
        }
    }

    async fn exchange(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolSchema],
    ) -> BackendResult<BackendReply> {
        let mut chat_req = ChatRequest::new(to_genai_messages(history));
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }
        let options = to_genai_options(&self.config);

        let chat_stream = self
            .client
            .exec_chat_stream(&self.config.model, chat_req, Some(&options))
            .await
            .map_err(|e| BackendError::request_failed(&self.config.name, e.to_string()))?;

        let mut text = String::new();
        let mut calls = Vec::new();
        let mut stream = chat_stream.stream;
        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => text.push_str(&chunk.content),
                Ok(ChatStreamEvent::End(end)) => {
                    if let Some(tool_calls) = end.captured_tool_calls() {
                        calls = tool_calls
                            .into_iter()
                            .enumerate()
                            .map(|(i, tc)| from_genai_tool_call(i, tc))
                            .collect();
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.logger.error(&format!("[StructuredBackend] Stream error: {}", e));
                    return Err(BackendError::stream_failed(&self.config.name, e.to_string()));
                }
            }
        }

        if calls.is_empty() {
            Ok(BackendReply::Answer(text))
        } else {
            Ok(BackendReply::ToolCalls {
                preamble: text.trim().to_string(),
                calls,
            })
        }
    }
}

#[async_trait]
impl CompletionBackend for StructuredBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> BackendResult<BackendReply> {
        self.logger.debug(&format!(
            "[StructuredBackend] Requesting {} with {} messages and {} tools",
            self.config.model,
            history.len(),
            tools.len()
        ));

        let timeout = Duration::from_secs(self.config.timeout_secs);
        cancel
            .run(tokio::time::timeout(timeout, self.exchange(history, tools)))
            .await
            .ok_or(BackendError::Cancelled)?
            .map_err(|_| BackendError::Timeout {
                backend: self.config.name.clone(),
                timeout,
            })?
    }
}
