//! Context builder — system prompt plus conversion of client conversation
//! messages into the provider's message format.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use toolrelay_core::types::{ChatContent, ChatMessage, ChatPart, Message, Role, ToolCall};

// ─────────────────────────────────────────────
// Context builder
// ─────────────────────────────────────────────

/// Builds the message list sent to the model on each step.
pub struct ContextBuilder {
    project_root: PathBuf,
    /// Replaces the generated identity section when set.
    identity_override: Option<String>,
}

impl ContextBuilder {
    pub fn new(project_root: impl Into<PathBuf>, identity_override: Option<String>) -> Self {
        Self {
            project_root: project_root.into(),
            identity_override: identity_override.filter(|s| !s.trim().is_empty()),
        }
    }

    // ────────────── System prompt ──────────────

    /// Build the full system prompt.
    pub fn build_system_prompt(&self, tool_count: usize) -> String {
        let identity = match &self.identity_override {
            Some(custom) => custom.clone(),
            None => self.build_identity(),
        };
        format!("{identity}\n\n---\n\n{}", self.build_environment(tool_count))
    }

    fn build_identity(&self) -> String {
        "# Identity\n\n\
         You are a capable assistant working inside a software project. \
         You have tools for arithmetic, the current time, project files, \
         and anything provided by connected MCP servers and skills.\n\n\
         Use tools whenever a request needs real data or a real change; \
         never pretend to have done something you did not do. \
         After using tools, answer briefly and say what you did."
            .to_string()
    }

    fn build_environment(&self, tool_count: usize) -> String {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let root = self.project_root.display();

        format!(
            "## Environment\n\n\
             - **Date/time**: {now}\n\
             - **Runtime**: Rust on {os}/{arch}\n\
             - **Project root**: `{root}`\n\
             - **Tools available**: {tool_count}\n\n\
             File paths are relative to the project root."
        )
    }

    // ────────────── Message building ──────────────

    /// Provider messages for a conversation, with the system prompt
    /// prepended unless the conversation already opens with one.
    pub fn build_messages(&self, history: &[ChatMessage], tool_count: usize) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if history.first().map(|m| m.role) != Some(Role::System) {
            messages.push(Message::system(self.build_system_prompt(tool_count)));
        }
        messages.extend(to_provider_messages(history));
        messages
    }
}

// ─────────────────────────────────────────────
// Conversion
// ─────────────────────────────────────────────

/// Convert client conversation messages to the provider format.
///
/// Tool-call parts become assistant `tool_calls` with JSON-string
/// arguments. Every tool-result part becomes its own `tool` message.
/// Assistant messages with neither text nor tool calls are dropped.
pub fn to_provider_messages(history: &[ChatMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(history.len());

    for message in history {
        let (text, calls, results) = split_parts(&message.content);

        match message.role {
            Role::System => out.push(Message::system(text)),
            Role::User => out.push(Message::user(text)),
            Role::Assistant if !calls.is_empty() => {
                let content = (!text.is_empty()).then_some(text);
                out.push(Message::assistant_tool_calls(content, calls));
            }
            Role::Assistant if !text.is_empty() => out.push(Message::assistant(text)),
            Role::Assistant | Role::Tool => {}
        }

        out.extend(
            results
                .into_iter()
                .map(|(id, result)| Message::tool_result(id, result_content(&result))),
        );
    }

    out
}

type SplitParts = (String, Vec<ToolCall>, Vec<(String, Value)>);

fn split_parts(content: &ChatContent) -> SplitParts {
    let parts = match content {
        ChatContent::Text(text) => return (text.clone(), Vec::new(), Vec::new()),
        ChatContent::Parts(parts) => parts,
    };

    let mut texts = Vec::new();
    let mut calls = Vec::new();
    let mut results = Vec::new();
    for part in parts {
        match part {
            ChatPart::Text { text } => texts.push(text.as_str()),
            ChatPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => calls.push(ToolCall::new(tool_call_id, tool_name, args.to_string())),
            ChatPart::ToolResult {
                tool_call_id,
                result,
                ..
            } => results.push((tool_call_id.clone(), result.clone())),
        }
    }
    (texts.join("\n"), calls, results)
}

/// Tool results travel to the model as text: strings verbatim, anything
/// else as compact JSON.
pub fn result_content(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_prompt_sections() {
        let ctx = ContextBuilder::new("/work/app", None);
        let prompt = ctx.build_system_prompt(7);
        assert!(prompt.contains("# Identity"));
        assert!(prompt.contains("/work/app"));
        assert!(prompt.contains("**Tools available**: 7"));
        assert!(prompt.contains("UTC"));
    }

    #[test]
    fn test_identity_override() {
        let ctx = ContextBuilder::new("/work/app", Some("You are Relay.".into()));
        let prompt = ctx.build_system_prompt(0);
        assert!(prompt.starts_with("You are Relay."));
        assert!(!prompt.contains("# Identity"));
        assert!(prompt.contains("/work/app"));
    }

    #[test]
    fn test_blank_override_ignored() {
        let ctx = ContextBuilder::new("/w", Some("  ".into()));
        assert!(ctx.build_system_prompt(0).contains("# Identity"));
    }

    #[test]
    fn test_prepends_system_prompt() {
        let ctx = ContextBuilder::new("/w", None);
        let msgs = ctx.build_messages(&[ChatMessage::user("hi")], 3);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(&msgs[0], Message::System { content } if content.contains("Tools available")));
        assert_eq!(msgs[1], Message::user("hi"));
    }

    #[test]
    fn test_keeps_existing_system_prompt() {
        let ctx = ContextBuilder::new("/w", None);
        let history = vec![ChatMessage::system("custom"), ChatMessage::user("hi")];
        let msgs = ctx.build_messages(&history, 3);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], Message::system("custom"));
    }

    #[test]
    fn test_tool_round_trip_conversion() {
        let history = vec![
            ChatMessage::user("What is 2+2?"),
            ChatMessage::assistant_tool_calls(
                Some("Let me calculate.".into()),
                vec![ChatPart::ToolCall {
                    tool_call_id: "call_1".into(),
                    tool_name: "calculator".into(),
                    args: json!({"expression": "2+2"}),
                }],
            ),
            ChatMessage::tool_result("call_1", "calculator", json!({"expression": "2+2", "result": 4})),
            ChatMessage::assistant("2 + 2 = 4"),
        ];

        let msgs = to_provider_messages(&history);
        assert_eq!(msgs.len(), 4);
        match &msgs[1] {
            Message::Assistant {
                content,
                tool_calls: Some(calls),
            } => {
                assert_eq!(content.as_deref(), Some("Let me calculate."));
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.name, "calculator");
                let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
                assert_eq!(args, json!({"expression": "2+2"}));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            msgs[2],
            Message::tool_result("call_1", r#"{"expression":"2+2","result":4}"#)
        );
        assert_eq!(msgs[3], Message::assistant("2 + 2 = 4"));
    }

    #[test]
    fn test_multiple_results_in_one_message() {
        let message = ChatMessage {
            role: Role::Tool,
            content: ChatContent::Parts(vec![
                ChatPart::ToolResult {
                    tool_call_id: "a".into(),
                    tool_name: "get_time".into(),
                    result: json!("noon"),
                },
                ChatPart::ToolResult {
                    tool_call_id: "b".into(),
                    tool_name: "get_time".into(),
                    result: json!({"ok": true}),
                },
            ]),
        };
        let msgs = to_provider_messages(&[message]);
        assert_eq!(
            msgs,
            vec![
                Message::tool_result("a", "noon"),
                Message::tool_result("b", r#"{"ok":true}"#),
            ]
        );
    }

    #[test]
    fn test_empty_assistant_dropped() {
        let msgs = to_provider_messages(&[ChatMessage::assistant("")]);
        assert!(msgs.is_empty());
    }
}
