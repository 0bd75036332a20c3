//! Toolrelay CLI — entry point.
//!
//! # Commands
//!
//! - `toolrelay serve [--host] [--port] [--project-root]` — discover tools and
//!   serve the HTTP API
//! - `toolrelay tools` — print the merged tool registry
//! - `toolrelay ask -m MESSAGE` — one-shot agent run from the terminal
//! - `toolrelay init` — write a default config and create the skills directory

mod helpers;
mod init;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use toolrelay_agent::{discover_tools, AgentLoop, Discovered, ToolRegistry};
use toolrelay_core::config::{load_config, Config};
use toolrelay_core::types::ChatMessage;
use toolrelay_core::utils::expand_home;
use toolrelay_providers::HttpProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Toolrelay — an LLM agent backend with local, MCP and skill tools
#[derive(Parser)]
#[command(name = "toolrelay", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (defaults to ~/.toolrelay/config.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Project root for file tools, mcp.json and .env
    #[arg(long, global = true)]
    project_root: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover tools and serve the HTTP API
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List every tool the agent can call
    Tools,

    /// Send a single message to the agent and print the answer
    Ask {
        /// The user message
        #[arg(short, long)]
        message: String,
    },

    /// Write a default config file and create the skills directory
    Init,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose, cli.common.json_logs);

    let config_path = cli.common.config.as_deref().map(expand_home);
    let project_root = cli.common.project_root;
    let load = || {
        let mut config = load_config(config_path.as_deref());
        if let Some(root) = &project_root {
            config.workspace.project_root = root.clone();
        }
        config
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = load();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_serve(config).await
        }
        Commands::Tools => run_tools(&load()).await,
        Commands::Ask { message } => run_ask(&load(), message).await,
        Commands::Init => init::run(&Config::default(), config_path.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn run_serve(config: Config) -> Result<()> {
    let Discovered { registry, mcp } = discover_tools(&config).await;
    let agent = build_agent_loop(&config, registry)?;

    let state = Arc::new(server::AppState::new(agent));
    let result = server::serve(&config.server, state).await;

    info!(providers = mcp.clients.len(), "stopping MCP providers");
    mcp.shutdown();
    result
}

async fn run_tools(config: &Config) -> Result<()> {
    let Discovered { registry, mcp } = discover_tools(config).await;
    helpers::print_tools(&registry);
    mcp.shutdown();
    Ok(())
}

async fn run_ask(config: &Config, message: String) -> Result<()> {
    let Discovered { registry, mcp } = discover_tools(config).await;
    let agent = build_agent_loop(config, registry)?;

    let result = agent
        .run(&[ChatMessage::user(message)])
        .await
        .context("agent processing failed");
    mcp.shutdown();

    helpers::print_output(&result?);
    Ok(())
}

/// Build an `AgentLoop` over the discovered registry.
fn build_agent_loop(config: &Config, registry: Arc<ToolRegistry>) -> Result<AgentLoop> {
    if !config.llm.is_configured() {
        warn!("no model API key configured; set OPENAI_API_KEY or llm.apiKey");
    }
    let provider = HttpProvider::new(&config.llm).context("failed to create LLM provider")?;
    Ok(AgentLoop::new(Arc::new(provider), registry, config))
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("toolrelay=debug,toolrelay_agent=debug,tower_http=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "toolrelay",
            "serve",
            "--port",
            "8080",
            "--project-root",
            "/tmp/work",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.common.verbose);
        assert_eq!(cli.common.project_root.as_deref(), Some("/tmp/work"));
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parse_ask_requires_message() {
        assert!(Cli::try_parse_from(["toolrelay", "ask"]).is_err());
        let cli = Cli::try_parse_from(["toolrelay", "--json-logs", "ask", "-m", "hi"]).unwrap();
        assert!(cli.common.json_logs);
        assert!(matches!(cli.command, Commands::Ask { message } if message == "hi"));
    }

    #[test]
    fn build_agent_loop_uses_configured_model() {
        let mut config = Config::default();
        config.llm.model = "gpt-4o-mini".to_string();
        let agent = build_agent_loop(&config, Arc::new(ToolRegistry::new())).unwrap();
        assert_eq!(agent.model(), "gpt-4o-mini");
    }
}
