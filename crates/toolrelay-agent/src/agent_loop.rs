//! Agent loop — the LLM ↔ tool-calling main loop.
//!
//! One call to [`AgentLoop::run`] handles one chat request: the model is
//! stepped until it answers in text or the step budget runs out. Nothing
//! is kept between runs.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use toolrelay_core::types::{
    ChatMessage, ChatPart, Message, Role, ToolCall, ToolCallRecord, ToolChoice,
};
use toolrelay_core::Config;
use toolrelay_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::classifier::{ActionClassifier, KeywordClassifier};
use crate::context::{result_content, ContextBuilder};
use crate::error::AgentError;
use crate::tools::base::params_from_value;
use crate::tools::registry::ToolRegistry;

/// Default maximum model steps per request.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Final text when tools ran but the model never answered in text.
pub const COMPLETION_NOTICE: &str =
    "I've completed the requested actions. Let me know if you need anything else.";

// ─────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────

/// Everything one run produced, in the shape `/api/chat` returns.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    /// Generated messages only: assistant tool calls, tool results and
    /// the final assistant text, in order.
    pub messages: Vec<ChatMessage>,
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub has_tool_calls: bool,
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    classifier: Arc<dyn ActionClassifier>,
    context: ContextBuilder,
    model: String,
    max_steps: usize,
    request_config: LlmRequestConfig,
}

impl AgentLoop {
    /// Create a loop over a shared registry, using the keyword classifier.
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: &Config) -> Self {
        let model = if config.llm.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.llm.model.clone()
        };
        let max_steps = match config.agent.max_steps {
            0 => DEFAULT_MAX_STEPS,
            n => n as usize,
        };
        let request_config = LlmRequestConfig {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            tool_choice: ToolChoice::Auto,
        };
        let context = ContextBuilder::new(
            config.workspace.project_root_path(),
            config.agent.system_prompt.clone(),
        );

        info!(
            model = %model,
            provider = provider.display_name(),
            tools = tools.len(),
            max_steps,
            "agent loop initialized"
        );

        Self {
            provider,
            tools,
            classifier: Arc::new(KeywordClassifier::new()),
            context,
            model,
            max_steps,
            request_config,
        }
    }

    /// Swap the action classifier (builder pattern).
    pub fn with_classifier(mut self, classifier: Arc<dyn ActionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the conversation to a final answer.
    ///
    /// Tool failures become `{"error": ...}` results the model sees; only
    /// provider failures end the run with an error.
    pub async fn run(&self, history: &[ChatMessage]) -> Result<AgentOutput, AgentError> {
        if history.is_empty() {
            return Err(AgentError::EmptyConversation);
        }

        let definitions = self.tools.get_definitions();
        let mut messages = self.context.build_messages(history, definitions.len());

        let force_tools = !definitions.is_empty()
            && history
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .is_some_and(|m| self.classifier.requires_action(&m.text()));
        if force_tools {
            debug!("action requested, first step must call a tool");
        }

        let mut generated = Vec::new();
        let mut records = Vec::new();
        let mut final_text: Option<String> = None;

        for step in 0..self.max_steps {
            let config = LlmRequestConfig {
                tool_choice: if step == 0 && force_tools {
                    ToolChoice::Required
                } else {
                    ToolChoice::Auto
                },
                ..self.request_config.clone()
            };

            debug!(step, tool_choice = ?config.tool_choice, "LLM call");
            let response = self
                .provider
                .chat(&messages, Some(&definitions), &self.model, &config)
                .await?;

            if !response.has_tool_calls() {
                final_text = response.content.filter(|t| !t.trim().is_empty());
                break;
            }

            let calls: Vec<(ToolCall, Value)> = response
                .tool_calls
                .iter()
                .map(|tc| (tc.clone(), parse_arguments(tc)))
                .collect();

            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            generated.push(ChatMessage::assistant_tool_calls(
                response.content,
                calls
                    .iter()
                    .map(|(tc, args)| ChatPart::ToolCall {
                        tool_call_id: tc.id.clone(),
                        tool_name: tc.function.name.clone(),
                        args: args.clone(),
                    })
                    .collect(),
            ));

            // One at a time, in the order the model asked.
            for (tc, args) in calls {
                info!(tool = %tc.function.name, step, "executing tool call");
                let result = self
                    .tools
                    .execute(&tc.function.name, params_from_value(args.clone()))
                    .await;
                debug!(tool = %tc.function.name, "tool result ready");

                messages.push(Message::tool_result(&tc.id, result_content(&result)));
                generated.push(ChatMessage::tool_result(
                    &tc.id,
                    &tc.function.name,
                    result.clone(),
                ));
                records.push(ToolCallRecord {
                    tool_call_id: tc.id,
                    tool_name: tc.function.name,
                    args,
                    result,
                });
            }
        }

        let text = match final_text {
            Some(text) => text,
            None if !records.is_empty() => {
                debug!(tool_calls = records.len(), "no final text, using completion notice");
                COMPLETION_NOTICE.to_string()
            }
            None => String::new(),
        };
        if !text.is_empty() {
            generated.push(ChatMessage::assistant(text.clone()));
        }

        info!(
            tool_calls = records.len(),
            text_len = text.len(),
            "agent run finished"
        );

        Ok(AgentOutput {
            messages: generated,
            text,
            has_tool_calls: !records.is_empty(),
            tool_calls: records,
        })
    }
}

/// Decode a call's JSON-string arguments. Anything unusable becomes `{}`.
fn parse_arguments(tc: &ToolCall) -> Value {
    let raw = tc.function.arguments.trim();
    if raw.is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(tool = %tc.function.name, arguments = %other, "tool arguments are not an object");
            json!({})
        }
        Err(e) => {
            warn!(tool = %tc.function.name, error = %e, "tool arguments are not valid JSON");
            json!({})
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
