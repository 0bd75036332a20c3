//! Tool Registry — the merged, name-keyed tool map.
//!
//! Built once at startup from three sources in fixed precedence order
//! (local, MCP, skills), then frozen behind an `Arc` and shared by every
//! request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use toolrelay_core::types::ToolDefinition;
use tracing::{debug, info, warn};

use super::base::Tool;

/// Where a registry entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolSource {
    Local,
    Mcp,
    Skill,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolSource::Local => "local",
            ToolSource::Mcp => "mcp",
            ToolSource::Skill => "skill",
        })
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across requests.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    sources: HashMap<String, ToolSource>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Register a tool. A later registration under the same name replaces the
    /// earlier one; the collision is logged with both sources.
    pub fn register(&mut self, source: ToolSource, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Some(previous) = self.sources.get(&name) {
            warn!(
                tool = %name,
                previous = %previous,
                replacement = %source,
                "tool name collision, later source overrides"
            );
        } else {
            debug!(tool = %name, source = %source, "registered tool");
        }
        self.sources.insert(name.clone(), source);
        self.tools.insert(name, tool);
    }

    /// Register every tool from one source.
    pub fn extend(&mut self, source: ToolSource, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        let before = self.tools.len();
        for tool in tools {
            self.register(source, tool);
        }
        info!(
            source = %source,
            added = self.tools.len().saturating_sub(before),
            total = self.tools.len(),
            "tool source merged"
        );
    }

    /// The full name → tool mapping.
    pub fn get_tools(&self) -> &HashMap<String, Arc<dyn Tool>> {
        &self.tools
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Source of a registered tool.
    pub fn source_of(&self, name: &str) -> Option<ToolSource> {
        self.sources.get(name).copied()
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the LLM-facing definitions for all registered tools.
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Execute a tool by name with the given parameters.
    ///
    /// Never fails: unknown tools and tool errors come back as
    /// `{"error": "..."}` so the model can see and react to them.
    pub async fn execute(&self, name: &str, params: HashMap<String, Value>) -> Value {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "tool not found");
            return json!({ "error": format!("Tool '{name}' not found") });
        };

        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                json!({ "error": format!("{e:#}") })
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
