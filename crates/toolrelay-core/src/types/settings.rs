//! Backend, tool server and turn configuration types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a completion backend carries tool calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Tool calls embedded in free text between sentinel markers
    TextSentinel,
    /// Native function calling (OpenAI-compatible `tools` field)
    Structured,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::TextSentinel => write!(f, "text-sentinel"),
            BackendKind::Structured => write!(f, "structured"),
        }
    }
}

/// Configuration for a completion backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name used by the CLI toggle and `--backend`
    pub name: String,
    /// Tool-call transport
    pub kind: BackendKind,
    /// Base URL of the OpenAI-compatible API (`.../v1`)
    pub endpoint: String,
    /// Model identifier as used by the API
    pub model: String,
    /// Environment variable (or secret key) holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Bounded wait for one request, in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_request_timeout() -> u64 {
    60
}

impl BackendConfig {
    /// Create a backend configuration with default limits
    pub fn new(
        name: impl Into<String>,
        kind: BackendKind,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key_env: None,
            max_tokens: default_max_tokens(),
            temperature: Some(0.7),
            timeout_secs: default_request_timeout(),
        }
    }

    /// Set the variable the API key is read from
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Chutes-hosted DeepSeek V3 over sentinel-encoded text
    pub fn chutes() -> Self {
        Self::new(
            "chutes",
            BackendKind::TextSentinel,
            "https://llm.chutes.ai/v1",
            "deepseek-ai/DeepSeek-V3-0324",
        )
        .with_api_key_env("CHUTES_API_TOKEN")
    }

    /// OpenRouter with native function calling
    pub fn openrouter() -> Self {
        Self::new(
            "openrouter",
            BackendKind::Structured,
            "https://openrouter.ai/api/v1",
            "deepseek-ai/DeepSeek-V3-0324",
        )
        .with_api_key_env("OPENROUTER_API_KEY")
    }
}

/// How to reach a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum ServerTransport {
    /// Spawn a child process and speak MCP over its stdio
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment; `${VAR}` values are resolved through the secret store
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    /// Streamable HTTP transport
    Http { url: String },
    /// Unix domain socket
    Unix { path: String },
}

/// A configured tool server (MCP provider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Provider id; becomes the namespace prefix of every tool it exposes
    pub name: String,
    /// Whether to connect at startup (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub transport: ServerTransport,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    /// A stdio server launched with `command args...`
    pub fn stdio(
        name: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            transport: ServerTransport::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: BTreeMap::new(),
            },
        }
    }

    /// A Streamable HTTP server
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            transport: ServerTransport::Http { url: url.into() },
        }
    }

    /// Add an environment variable (stdio servers only)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ServerTransport::Stdio { ref mut env, .. } = self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Disable the server
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Limits applied to every turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSettings {
    /// Maximum backend requests within one turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Timeout for one tool dispatch, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// Keep at most this many history messages (leading system message excluded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,
}

fn default_max_iterations() -> usize {
    8
}

fn default_tool_timeout() -> u64 {
    30
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_secs: default_tool_timeout(),
            max_history: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_presets() {
        let chutes = BackendConfig::chutes();
        assert_eq!(chutes.kind, BackendKind::TextSentinel);
        assert_eq!(chutes.api_key_env.as_deref(), Some("CHUTES_API_TOKEN"));
        assert_eq!(chutes.max_tokens, 2000);
        assert_eq!(chutes.timeout_secs, 60);

        let openrouter = BackendConfig::openrouter();
        assert_eq!(openrouter.kind, BackendKind::Structured);
    }

    #[test]
    fn test_server_config_yaml() {
        let yaml = r#"
name: brave
transport: stdio
command: npx
args: ["-y", "@modelcontextprotocol/server-brave-search"]
env:
  BRAVE_API_KEY: "${BRAVE_API_KEY}"
"#;
        let server: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(server.name, "brave");
        assert!(server.enabled);
        match server.transport {
            ServerTransport::Stdio { command, args, env } => {
                assert_eq!(command, "npx");
                assert_eq!(args.len(), 2);
                assert_eq!(env["BRAVE_API_KEY"], "${BRAVE_API_KEY}");
            }
            other => panic!("unexpected transport: {other:?}"),
        }
    }

    #[test]
    fn test_http_server_config_yaml() {
        let server: ServerConfig =
            serde_yaml::from_str("name: remote\ntransport: http\nurl: http://localhost:8000/mcp\nenabled: false\n")
                .unwrap();
        assert!(!server.enabled);
        assert_eq!(
            server.transport,
            ServerTransport::Http {
                url: "http://localhost:8000/mcp".to_string()
            }
        );
    }

    #[test]
    fn test_turn_settings_defaults() {
        let settings: TurnSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, TurnSettings::default());
        assert_eq!(settings.max_iterations, 8);
        assert_eq!(settings.tool_timeout_secs, 30);
    }
}
