//! Prompt formatter
//!
//! Renders a conversation and the tool catalogue into the flat
//! `{role, content}` messages a text-only backend consumes. Roles and tool
//! traffic are conveyed through sentinel framing inside the content.

use crate::types::{ChatMessage, ConversationMessage, ToolCallRecord, ToolSchema};

use super::sentinels::{
    ASSISTANT_TAG, CALLS_BEGIN, CALLS_END, CALL_BEGIN, CALL_END, CALL_SEPARATOR, CODE_FENCE,
    END_OF_SENTENCE, JSON_FENCE, OUTPUTS_BEGIN, OUTPUTS_END, OUTPUT_BEGIN, OUTPUT_END, USER_TAG,
};

/// Default instruction preamble placed ahead of the tool grammar
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant with access to external tools. \
     Use a tool only when it is needed to answer the user.";

/// Formats histories for text-sentinel backends
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    system_prompt: String,
}

impl Default for PromptFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptFormatter {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Formatter using `system_prompt` when set, the default otherwise
    pub fn with_optional_prompt(system_prompt: Option<&str>) -> Self {
        system_prompt.map(Self::new).unwrap_or_default()
    }

    /// Render the request messages for `history` and `tools`
    ///
    /// Pure function of its inputs: the same history and catalogue always
    /// produce the same messages.
    pub fn format(&self, history: &[ConversationMessage], tools: &[ToolSchema]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        let tool_block = (!tools.is_empty()).then(|| self.tool_block(tools));
        let mut merged = false;

        if let Some(block) = &tool_block {
            if !history.iter().any(ConversationMessage::is_system) {
                messages.push(ChatMessage::system(block.clone()));
                merged = true;
            }
        }

        for message in history {
            match message {
                ConversationMessage::System { text } => match (&tool_block, merged) {
                    (Some(block), false) => {
                        messages.push(ChatMessage::system(format!("{block}\n\n{text}")));
                        merged = true;
                    }
                    _ => messages.push(ChatMessage::system(text.clone())),
                },
                ConversationMessage::User { text } => {
                    messages.push(ChatMessage::user(format!("{USER_TAG}{text}{ASSISTANT_TAG}")));
                }
                ConversationMessage::Assistant { text, tool_calls } if tool_calls.is_empty() => {
                    if !text.is_empty() {
                        messages.push(ChatMessage::assistant(format!("{text}{END_OF_SENTENCE}")));
                    }
                }
                ConversationMessage::Assistant { text, tool_calls } => {
                    messages.push(ChatMessage::assistant(encode_calls(text, tool_calls)));
                }
                ConversationMessage::ToolResult {
                    tool_name, text, ..
                } => {
                    messages.push(ChatMessage::system(encode_output(tool_name, text)));
                }
            }
        }

        messages
    }

    /// Preamble, call grammar and catalogue
    fn tool_block(&self, tools: &[ToolSchema]) -> String {
        let mut block = String::new();
        block.push_str(&self.system_prompt);
        block.push_str("\n\n");
        block.push_str(&grammar());
        block.push_str("\n\n## Available tools\n");
        for tool in tools {
            block.push('\n');
            block.push_str(&catalogue_entry(tool));
        }
        block
    }
}

/// Literal description of the call syntax
fn grammar() -> String {
    format!(
        "When you need a tool, reply with exactly this sequence:\n\
         {CALLS_BEGIN}{CALL_BEGIN}function{CALL_SEPARATOR}TOOL_NAME\n\
         {JSON_FENCE}\n{{\"param1\": \"value1\"}}\n{CODE_FENCE}{CALL_END}{CALLS_END}\n\
         Several calls may follow each other inside one {CALLS_BEGIN} ... {CALLS_END} block; \
         they run in the order written. Arguments must be a valid JSON object. \
         Tool results come back between {OUTPUTS_BEGIN} and {OUTPUTS_END}. \
         When no tool is needed, answer in plain text."
    )
}

fn catalogue_entry(tool: &ToolSchema) -> String {
    let schema = serde_json::to_string_pretty(&tool.to_function_json())
        .unwrap_or_else(|_| tool.to_function_json().to_string());
    format!("- `{}`:\n{JSON_FENCE}\n{schema}\n{CODE_FENCE}\n", tool.name)
}

/// Encode an assistant message that issued tool calls
pub fn encode_calls(preamble: &str, calls: &[ToolCallRecord]) -> String {
    let mut out = String::from(preamble);
    out.push_str(CALLS_BEGIN);
    for call in calls {
        out.push_str(&format!(
            "{CALL_BEGIN}{}{CALL_SEPARATOR}{}\n{JSON_FENCE}\n{}\n{CODE_FENCE}{CALL_END}",
            call.kind.as_str(),
            call.tool_name,
            call.raw_arguments
        ));
    }
    out.push_str(CALLS_END);
    out.push_str(END_OF_SENTENCE);
    out
}

/// Encode a tool result as a system-role note
pub fn encode_output(tool_name: &str, text: &str) -> String {
    format!(
        "{OUTPUTS_BEGIN}{OUTPUT_BEGIN}{tool_name}\n{CODE_FENCE}\n{text}\n{CODE_FENCE}{OUTPUT_END}{OUTPUTS_END}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::{parse_completion, ParseOutcome};
    use crate::types::{MessageRole, ToolResult};
    use serde_json::json;

    fn weather_tool() -> ToolSchema {
        ToolSchema::new("weather__now", "Current weather").with_input_schema(&json!({
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        }))
    }

    #[test]
    fn test_no_tools_means_no_catalogue() {
        let history = vec![
            ConversationMessage::system("Be brief."),
            ConversationMessage::user("weather?"),
        ];
        let messages = PromptFormatter::default().format(&history, &[]);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("Be brief."));
        for message in &messages {
            assert!(!message.content.contains(CALLS_BEGIN));
            assert!(!message.content.contains("Available tools"));
        }
    }

    #[test]
    fn test_catalogue_merged_into_existing_system() {
        let history = vec![
            ConversationMessage::system("Be brief."),
            ConversationMessage::user("weather in Oslo?"),
        ];
        let messages = PromptFormatter::new("PREAMBLE").format(&history, &[weather_tool()]);

        assert_eq!(messages.len(), 2);
        let system = &messages[0];
        assert_eq!(system.role, MessageRole::System);
        assert!(system.content.starts_with("PREAMBLE\n\n"));
        assert!(system.content.ends_with("\n\nBe brief."));
        assert!(system.content.contains("- `weather__now`:"));
        assert!(system.content.contains("\"required\": [\n"));
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.role == MessageRole::System)
                .count(),
            1
        );
    }

    #[test]
    fn test_catalogue_added_when_no_system_message() {
        let history = vec![ConversationMessage::user("hi")];
        let messages = PromptFormatter::default().format(&history, &[weather_tool()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(messages[1].content, format!("{USER_TAG}hi{ASSISTANT_TAG}"));
    }

    #[test]
    fn test_assistant_and_tool_result_framing() {
        let call = ToolCallRecord::new("call_0", "weather__now", r#"{"city":"Oslo"}"#);
        let history = vec![
            ConversationMessage::user("weather?"),
            ConversationMessage::assistant_with_calls("Checking.", vec![call]),
            ConversationMessage::tool_result(ToolResult::success("call_0", "weather__now", "3C")),
            ConversationMessage::assistant("It is 3C."),
        ];
        let messages = PromptFormatter::default().format(&history, &[]);

        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[1].content,
            format!(
                "Checking.{CALLS_BEGIN}{CALL_BEGIN}function{CALL_SEPARATOR}weather__now\n```json\n{{\"city\":\"Oslo\"}}\n```{CALL_END}{CALLS_END}{END_OF_SENTENCE}"
            )
        );
        assert_eq!(messages[2].role, MessageRole::System);
        assert_eq!(
            messages[2].content,
            format!("{OUTPUTS_BEGIN}{OUTPUT_BEGIN}weather__now\n```\n3C\n```{OUTPUT_END}{OUTPUTS_END}")
        );
        assert_eq!(messages[3].content, format!("It is 3C.{END_OF_SENTENCE}"));
    }

    #[test]
    fn test_encoded_call_round_trips_through_parser() {
        let call = ToolCallRecord::new("call_0", "github__search_issues", r#"{"q": "label:bug", "n": 3}"#);
        let encoded = encode_calls("Looking that up.", std::slice::from_ref(&call));

        match parse_completion(&encoded) {
            ParseOutcome::ToolCallBatch { preamble, calls, skipped } => {
                assert_eq!(preamble, "Looking that up.");
                assert_eq!(calls, vec![call]);
                assert!(skipped.is_empty());
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn test_format_is_idempotent() {
        let formatter = PromptFormatter::default();
        let history = vec![
            ConversationMessage::system("sys"),
            ConversationMessage::user("q"),
            ConversationMessage::assistant_with_calls(
                "",
                vec![ToolCallRecord::new("call_0", "weather__now", "{}")],
            ),
            ConversationMessage::tool_result(ToolResult::error("call_0", "weather__now", "boom")),
        ];
        let tools = vec![weather_tool()];

        assert_eq!(
            formatter.format(&history, &tools),
            formatter.format(&history, &tools)
        );
    }

    #[test]
    fn test_empty_plain_assistant_is_omitted() {
        let history = vec![
            ConversationMessage::user("q"),
            ConversationMessage::assistant(""),
        ];
        assert_eq!(PromptFormatter::default().format(&history, &[]).len(), 1);
    }
}
