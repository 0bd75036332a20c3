//! Registry adapter for tools imported from an MCP provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use super::client::{CallToolResult, McpSession, McpToolInfo};
use crate::tools::schema::ObjectSchema;
use crate::tools::Tool;

/// A provider tool exposed as `{provider}_{tool}`.
pub struct McpTool {
    full_name: String,
    remote_name: String,
    description: String,
    parameters: Value,
    session: Arc<dyn McpSession>,
}

impl McpTool {
    pub fn new(provider: &str, info: McpToolInfo, session: Arc<dyn McpSession>) -> Self {
        let full_name = format!("{provider}_{}", info.name);
        let parameters = ObjectSchema::for_tool_input(info.input_schema.as_ref(), &full_name).to_json();
        let description = info
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} (from MCP provider '{provider}')", info.name));

        Self {
            full_name,
            remote_name: info.name,
            description,
            parameters,
            session,
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.full_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let arguments = Value::Object(params.into_iter().collect());

        let outcome = match self.session.call_tool(&self.remote_name, arguments).await {
            Ok(result) if result.is_error => json!({
                "success": false,
                "error": render_result(&result),
                "toolName": self.remote_name,
            }),
            Ok(result) => json!({
                "success": true,
                "result": render_result(&result),
                "toolName": self.remote_name,
            }),
            Err(e) => {
                warn!(tool = %self.full_name, error = %e, "MCP tool call failed");
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "toolName": self.remote_name,
                })
            }
        };
        Ok(outcome)
    }
}

/// Collapse a `tools/call` result into a single JSON value.
///
/// Structured content wins. A lone text item becomes a string, several
/// become one newline-joined string. Anything non-text keeps its shape.
fn render_result(result: &CallToolResult) -> Value {
    if let Some(structured) = &result.structured_content {
        return structured.clone();
    }

    let items: Vec<Value> = result.content.iter().map(render_item).collect();
    if items.is_empty() {
        return Value::Null;
    }
    if items.iter().all(Value::is_string) {
        let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        return Value::String(joined.join("\n"));
    }
    if items.len() == 1 {
        return items.into_iter().next().unwrap_or(Value::Null);
    }
    Value::Array(items)
}

fn render_item(item: &Value) -> Value {
    match item.get("type").and_then(Value::as_str) {
        Some("text") => item.get("text").cloned().unwrap_or(Value::Null),
        Some("resource") => {
            let resource = item.get("resource").unwrap_or(&Value::Null);
            json!({
                "uri": resource.get("uri"),
                "mimeType": resource.get("mimeType"),
                "text": resource.get("text"),
            })
        }
        Some("resource_link") => json!({
            "uri": item.get("uri"),
            "name": item.get("name"),
        }),
        Some(kind @ ("image" | "audio")) => Value::String(format!(
            "[{kind} content: {}]",
            item.get("mimeType").and_then(Value::as_str).unwrap_or("unknown")
        )),
        _ => item.clone(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
