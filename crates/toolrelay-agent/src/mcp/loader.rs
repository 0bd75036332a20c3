//! Connect every configured MCP provider and import its tools.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use toolrelay_core::config::McpConfig;
use toolrelay_core::utils::expand_home;
use toolrelay_core::EnvOverlay;
use tracing::{info, warn};

use super::client::{McpClient, McpSession, McpToolInfo};
use super::config::{find_config_file, parse_providers, read_config_file, ProviderSpec, Transport};
use super::template::TemplateContext;
use super::tool::McpTool;
use crate::error::McpError;
use crate::tools::Tool;

/// Tools imported from providers, plus the live clients backing them.
#[derive(Default)]
pub struct McpImport {
    pub tools: Vec<Arc<dyn Tool>>,
    pub clients: Vec<Arc<McpClient>>,
}

impl McpImport {
    /// Kill every provider process.
    pub fn shutdown(&self) {
        for client in &self.clients {
            client.shutdown();
        }
    }
}

/// Load the provider config and connect all stdio providers concurrently.
///
/// Never fails: a missing config yields nothing, and each provider that
/// cannot connect or list its tools is logged and skipped.
pub async fn load_mcp_tools(project_root: &Path, config: &McpConfig, env: &EnvOverlay) -> McpImport {
    let explicit = config.config_path.as_deref().map(expand_home);
    let Some(path) = find_config_file(project_root, explicit.as_deref()) else {
        info!("no MCP config found, skipping provider tools");
        return McpImport::default();
    };

    let document = match read_config_file(&path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring MCP config");
            return McpImport::default();
        }
    };

    let ctx = TemplateContext::new(project_root, env);
    let specs = parse_providers(&document, &ctx);
    info!(path = %path.display(), providers = specs.len(), "loaded MCP config");

    connect_all(specs, config.request_timeout()).await
}

async fn connect_all(specs: Vec<ProviderSpec>, timeout: Duration) -> McpImport {
    // Specs arrive sorted by id; handles are awaited in that order.
    let mut handles = Vec::new();

    for spec in specs {
        match spec.transport {
            Transport::Stdio(launch) => {
                let id = spec.id.clone();
                let handle = tokio::spawn(async move { connect_one(&id, &launch, timeout).await });
                handles.push((spec.id, handle));
            }
            Transport::Remote { kind, url } => {
                warn!(
                    provider = %spec.id,
                    transport = %kind,
                    url = url.as_deref().unwrap_or(""),
                    "remote MCP transports are not supported, skipping"
                );
            }
        }
    }

    let mut connected = Vec::new();
    for (id, handle) in handles {
        match handle.await {
            Ok(Ok((client, tools))) => connected.push((id, client, tools)),
            Ok(Err(e)) => {
                warn!(provider = %id, error = %e, "MCP provider unavailable, skipping");
            }
            Err(e) => warn!(provider = %id, error = %e, "MCP connect task failed"),
        }
    }

    let mut import = McpImport::default();
    for (id, client, infos) in connected {
        info!(provider = %id, tools = infos.len(), "imported MCP tools");
        let session: Arc<dyn McpSession> = client.clone();
        import.tools.extend(
            infos
                .into_iter()
                .map(|info| Arc::new(McpTool::new(&id, info, session.clone())) as Arc<dyn Tool>),
        );
        import.clients.push(client);
    }
    import
}

async fn connect_one(
    id: &str,
    launch: &super::config::StdioLaunch,
    timeout: Duration,
) -> Result<(Arc<McpClient>, Vec<McpToolInfo>), McpError> {
    let client = McpClient::connect(id, launch, timeout).await?;
    let tools = client.list_tools().await?;
    Ok((Arc::new(client), tools))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
