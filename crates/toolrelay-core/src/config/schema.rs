//! Configuration schema.
//!
//! Hierarchy: `Config` → `LlmConfig`, `AgentConfig`, `ServerConfig`,
//! `WorkspaceConfig`, `McpConfig`, `SkillsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{expand_home, get_default_skills_path};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.toolrelay/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub mcp: McpConfig,
    pub skills: SkillsConfig,
}

// ─────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────

/// Hosted model API settings (any OpenAI-compatible endpoint).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// API key for authentication. Falls back to `OPENAI_API_KEY`.
    pub api_key: String,
    /// API base URL (without the `/chat/completions` suffix).
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            extra_headers: None,
        }
    }
}

impl LlmConfig {
    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Maximum model steps per request.
    pub max_steps: u32,
    /// Replaces the generated identity section of the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            system_prompt: None,
        }
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

// ─────────────────────────────────────────────
// Workspace
// ─────────────────────────────────────────────

/// Project workspace settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Root directory for file tools, `${workspaceFolder}` and `mcp.json`.
    pub project_root: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_root: ".".to_string(),
        }
    }
}

impl WorkspaceConfig {
    /// Resolve the project root to an absolute path.
    ///
    /// Relative paths resolve against the current directory; symlinks are
    /// resolved when the directory exists.
    pub fn project_root_path(&self) -> PathBuf {
        let path = expand_home(&self.project_root);
        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
        };
        absolute.canonicalize().unwrap_or(absolute)
    }
}

// ─────────────────────────────────────────────
// MCP
// ─────────────────────────────────────────────

/// Timeout used when a configured timeout is zero.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn timeout_or_default(secs: u64) -> Duration {
    match secs {
        0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        n => Duration::from_secs(n),
    }
}

/// External tool provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpConfig {
    /// Explicit provider config file; skips the project/user lookup when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    /// Per-request timeout for provider JSON-RPC calls.
    pub request_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl McpConfig {
    /// Per-request timeout; `0` means the default.
    pub fn request_timeout(&self) -> Duration {
        timeout_or_default(self.request_timeout_secs)
    }
}

// ─────────────────────────────────────────────
// Skills
// ─────────────────────────────────────────────

/// Skills directory settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillsConfig {
    /// Directory scanned for `<name>/SKILL.md`.
    pub dir: String,
    /// Timeout for each executed snippet.
    pub script_timeout_secs: u64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dir: get_default_skills_path().to_string_lossy().to_string(),
            script_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SkillsConfig {
    /// The skills directory with `~` expanded.
    pub fn dir_path(&self) -> PathBuf {
        expand_home(&self.dir)
    }

    /// Per-snippet timeout; `0` means the default.
    pub fn script_timeout(&self) -> Duration {
        timeout_or_default(self.script_timeout_secs)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.llm.api_base, "https://api.openai.com/v1");
        assert!(!config.llm.is_configured());
        assert!(config.skills.dir.ends_with("skills"));
    }

    #[test]
    fn test_camel_case_keys() {
        let raw = serde_json::to_value(Config::default()).unwrap();
        assert!(raw["llm"].get("maxTokens").is_some());
        assert!(raw["agent"].get("maxSteps").is_some());
        assert!(raw["workspace"].get("projectRoot").is_some());
        assert!(raw["skills"].get("scriptTimeoutSecs").is_some());
        assert!(raw["llm"].get("max_tokens").is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"llm": {"model": "gpt-4o-mini"}, "server": {"port": 8080}}"#)
                .unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_zero_timeouts_fall_back_to_default() {
        let config: Config = serde_json::from_str(
            r#"{"mcp": {"requestTimeoutSecs": 0}, "skills": {"scriptTimeoutSecs": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.mcp.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.skills.script_timeout(), Duration::from_secs(60));

        let config: Config =
            serde_json::from_str(r#"{"mcp": {"requestTimeoutSecs": 5}}"#).unwrap();
        assert_eq!(config.mcp.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_project_root_relative_is_absolute() {
        let ws = WorkspaceConfig::default();
        assert!(ws.project_root_path().is_absolute());
    }

    #[test]
    fn test_project_root_absolute_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceConfig {
            project_root: dir.path().to_string_lossy().to_string(),
        };
        assert_eq!(
            ws.project_root_path(),
            dir.path().canonicalize().unwrap()
        );
    }
}
