//! HTTP transport for OpenAI-compatible `chat/completions` endpoints

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::error::{BackendError, BackendResult};
use super::traits::{CompletionRequest, CompletionTransport};
use crate::logging::Logger;
use crate::types::BackendConfig;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// POSTs requests to `{endpoint}/chat/completions`
///
/// Non-200 responses map straight to `BackendError::ApiError`; there is no
/// retry.
pub struct HttpTransport {
    name: String,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
    logger: Arc<dyn Logger>,
}

impl HttpTransport {
    /// Create a transport for `config`, authenticating with `api_key` if given
    pub fn new(
        config: &BackendConfig,
        api_key: Option<String>,
        logger: Arc<dyn Logger>,
    ) -> BackendResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            name: config.name.clone(),
            url: completions_url(&config.endpoint),
            api_key,
            timeout,
            client,
            logger,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `{endpoint}/chat/completions`, tolerating a trailing slash
pub fn completions_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &CompletionRequest) -> BackendResult<String> {
        self.logger.debug(&format!(
            "[HttpTransport] POST {} ({} messages, model={})",
            self.url,
            request.messages.len(),
            request.model
        ));

        let mut builder = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout {
                    backend: self.name.clone(),
                    timeout: self.timeout,
                }
            } else {
                BackendError::Http(e)
            }
        })?;

        let status = response.status();
        if !is_accepted(status) {
            let body = response.text().await.unwrap_or_default();
            self.logger.error(&format!(
                "[HttpTransport] {} returned {}: {}",
                self.name, status, body
            ));
            return Err(BackendError::api_error(&self.name, status.as_u16(), body));
        }

        let body = response.text().await?;
        extract_content(&self.name, &body)
    }
}

/// Only a 200 carries a completion; any other status is an error
pub(crate) fn is_accepted(status: StatusCode) -> bool {
    status == StatusCode::OK
}

/// Pull `choices[0].message.content` out of a response body
pub(crate) fn extract_content(backend: &str, body: &str) -> BackendResult<String> {
    let parsed: CompletionResponse = serde_json::from_str(body)?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::invalid_response(backend, "response has no choices"))?;

    Ok(choice.message.content.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://llm.chutes.ai/v1"),
            "https://llm.chutes.ai/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://llm.chutes.ai/v1/"),
            "https://llm.chutes.ai/v1/chat/completions"
        );
    }

    #[test]
    fn test_only_200_is_accepted() {
        assert!(is_accepted(StatusCode::OK));
        assert!(!is_accepted(StatusCode::CREATED));
        assert!(!is_accepted(StatusCode::ACCEPTED));
        assert!(!is_accepted(StatusCode::NO_CONTENT));
        assert!(!is_accepted(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(extract_content("chutes", body).unwrap(), "hello");

        let null_content = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(extract_content("chutes", null_content).unwrap(), "");
    }

    #[test]
    fn test_extract_content_rejects_bad_shapes() {
        assert!(matches!(
            extract_content("chutes", r#"{"choices":[]}"#),
            Err(BackendError::InvalidResponse { .. })
        ));
        assert!(matches!(
            extract_content("chutes", "<html>"),
            Err(BackendError::Json(_))
        ));
    }

    #[test]
    fn test_transport_from_config() {
        let transport =
            HttpTransport::new(&BackendConfig::chutes(), None, Arc::new(NoOpLogger)).unwrap();
        assert_eq!(transport.name(), "chutes");
        assert_eq!(transport.url(), "https://llm.chutes.ai/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest {
            model: "deepseek-ai/DeepSeek-V3-0324".into(),
            messages: vec![crate::types::ChatMessage::user("hi")],
            max_tokens: 2000,
            temperature: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 2000);
        assert!(value.get("temperature").is_none());
    }
}
