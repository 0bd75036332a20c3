//! Startup discovery: local tools, then MCP providers, then skills.
//!
//! Sources are merged in that order; on a name collision the later source
//! wins and the collision is logged by the registry.

use std::path::Path;
use std::sync::Arc;

use toolrelay_core::{Config, EnvOverlay};
use tracing::info;

use crate::mcp::{load_mcp_tools, McpImport};
use crate::skills::{load_skill_tools, ScriptRunner};
use crate::tools::calculator::CalculatorTool;
use crate::tools::clock::ClockTool;
use crate::tools::filesystem::{DeleteFileTool, ReadFileTool, WriteFileTool};
use crate::tools::registry::{ToolRegistry, ToolSource};
use crate::tools::Tool;

/// The finished registry plus the provider processes backing MCP tools.
pub struct Discovered {
    pub registry: Arc<ToolRegistry>,
    pub mcp: McpImport,
}

/// Built-in tools scoped to `project_root`.
pub fn local_tools(project_root: &Path) -> Vec<Arc<dyn Tool>> {
    let root = project_root.to_path_buf();
    vec![
        Arc::new(CalculatorTool),
        Arc::new(ClockTool),
        Arc::new(ReadFileTool::new(root.clone())),
        Arc::new(WriteFileTool::new(root.clone())),
        Arc::new(DeleteFileTool::new(root)),
    ]
}

/// Build the registry once at startup. Never fails; unavailable MCP
/// providers and unreadable skills are skipped with a log line.
pub async fn discover_tools(config: &Config) -> Discovered {
    let project_root = config.workspace.project_root_path();
    let env = EnvOverlay::for_project(&project_root);

    let mut registry = ToolRegistry::new();
    registry.extend(ToolSource::Local, local_tools(&project_root));

    let mcp = load_mcp_tools(&project_root, &config.mcp, &env).await;
    registry.extend(ToolSource::Mcp, mcp.tools.iter().cloned());

    let runner = Arc::new(ScriptRunner::new(
        project_root.clone(),
        config.skills.script_timeout(),
    ));
    registry.extend(
        ToolSource::Skill,
        load_skill_tools(&config.skills.dir_path(), runner),
    );

    info!(
        project_root = %project_root.display(),
        tools = registry.len(),
        "tool discovery complete"
    );

    Discovered {
        registry: Arc::new(registry),
        mcp,
    }
}
