//! MCP provider integration: config, templating, stdio client, and the
//! adapter that turns provider tools into registry entries.

pub mod client;
pub mod config;
pub mod loader;
pub mod template;
pub mod tool;

pub use client::{CallToolResult, McpClient, McpSession, McpToolInfo};
pub use loader::{load_mcp_tools, McpImport};
pub use tool::McpTool;
