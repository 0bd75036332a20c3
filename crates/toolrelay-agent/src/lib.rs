//! Toolrelay Agent — tool registry, capability loaders, and the agent loop.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, schema translation, built-in local tools
//! - **mcp**: MCP provider config, stdio client, and imported tools
//! - **skills**: `SKILL.md` scanner and snippet runner
//! - **discovery**: assembles the registry at startup
//! - **classifier** / **context** / **agent_loop**: the LLM ↔ tool-calling loop

pub mod agent_loop;
pub mod classifier;
pub mod context;
pub mod discovery;
pub mod error;
pub mod mcp;
pub mod skills;
pub mod tools;

pub use agent_loop::{AgentLoop, AgentOutput, COMPLETION_NOTICE};
pub use classifier::{ActionClassifier, KeywordClassifier};
pub use context::ContextBuilder;
pub use discovery::{discover_tools, Discovered};
pub use error::{AgentError, McpError};
pub use tools::{Tool, ToolRegistry, ToolSource};
