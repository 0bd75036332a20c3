//! MCP provider configuration (`mcp.json`).
//!
//! Accepted layouts:
//!
//! ```json
//! { "mcpServers": { "github": { "command": "npx", "args": ["-y", "server-github"] } } }
//! ```
//!
//! or the bare map `{ "github": { ... } }`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use toolrelay_core::env_file::load_env_file;
use tracing::{debug, warn};

use super::template::{resolve_value, TemplateContext};
use crate::error::McpError;

/// One entry of the config file, after template resolution.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEntry {
    #[serde(rename = "type")]
    pub transport: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub env_file: Option<String>,
    pub cwd: Option<String>,
    pub url: Option<String>,
    pub disabled: bool,
}

/// How a provider is reached.
#[derive(Clone, Debug, PartialEq)]
pub enum Transport {
    /// Child process speaking JSON-RPC over stdin/stdout.
    Stdio(StdioLaunch),
    /// HTTP-based transport (`http`, `sse`, `streamable-http`).
    Remote { kind: String, url: Option<String> },
}

/// Everything needed to launch a local-process provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StdioLaunch {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// A resolved provider: identifier plus transport.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderSpec {
    pub id: String,
    pub transport: Transport,
}

/// Locate the provider config file.
///
/// An explicit path wins; otherwise `<projectRoot>/mcp.json`, then the
/// user-level `~/.toolrelay/mcp.json`. `None` when nothing exists.
pub fn find_config_file(project_root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured MCP config file does not exist");
        return None;
    }

    [
        project_root.join("mcp.json"),
        toolrelay_core::utils::get_user_mcp_config_path(),
    ]
    .into_iter()
    .find(|p| p.is_file())
}

/// Read and parse a config file into its raw JSON document.
pub fn read_config_file(path: &Path) -> Result<Value, McpError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| McpError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| McpError::Config(format!("invalid JSON in {}: {e}", path.display())))
}

/// Turn a config document into provider specs.
///
/// Entries are processed in key order. Templates are resolved before the
/// entry is interpreted; disabled entries and entries that fail to parse
/// are skipped.
pub fn parse_providers(document: &Value, ctx: &TemplateContext<'_>) -> Vec<ProviderSpec> {
    let servers = document
        .get("mcpServers")
        .and_then(Value::as_object)
        .or_else(|| document.as_object());
    let Some(servers) = servers else {
        warn!("MCP config is not a JSON object, ignoring");
        return Vec::new();
    };

    let ordered: BTreeMap<&String, &Value> = servers.iter().collect();
    let mut specs = Vec::new();

    for (id, raw) in ordered {
        let mut raw = raw.clone();
        resolve_value(&mut raw, ctx);

        let entry: ProviderEntry = match serde_json::from_value(raw) {
            Ok(e) => e,
            Err(e) => {
                warn!(provider = %id, error = %e, "skipping malformed MCP provider entry");
                continue;
            }
        };

        if entry.disabled {
            debug!(provider = %id, "MCP provider disabled");
            continue;
        }

        match into_transport(id, entry, ctx.workspace) {
            Some(transport) => specs.push(ProviderSpec {
                id: id.clone(),
                transport,
            }),
            None => continue,
        }
    }

    specs
}

fn into_transport(id: &str, entry: ProviderEntry, workspace: &Path) -> Option<Transport> {
    let kind = entry
        .transport
        .clone()
        .unwrap_or_else(|| if entry.command.is_some() { "stdio" } else { "http" }.to_string());

    match kind.as_str() {
        "stdio" => {
            let Some(command) = entry.command.filter(|c| !c.trim().is_empty()) else {
                warn!(provider = %id, "stdio MCP provider has no command, skipping");
                return None;
            };

            // File values first; explicit `env` entries win.
            let mut env = match &entry.env_file {
                Some(file) => load_env_file(&relative_to(workspace, file)),
                None => HashMap::new(),
            };
            env.extend(entry.env);

            Some(Transport::Stdio(StdioLaunch {
                command,
                args: entry.args,
                env,
                cwd: entry.cwd.map(|c| relative_to(workspace, &c)),
            }))
        }
        "http" | "sse" | "streamable-http" | "streamableHttp" => Some(Transport::Remote {
            kind,
            url: entry.url,
        }),
        other => {
            warn!(provider = %id, transport = other, "unknown MCP transport, skipping");
            None
        }
    }
}

fn relative_to(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolrelay_core::EnvOverlay;

    fn ctx<'a>(workspace: &'a Path, env: &'a EnvOverlay) -> TemplateContext<'a> {
        TemplateContext {
            workspace,
            home: Some(PathBuf::from("/home/dev")),
            env,
        }
    }

    #[test]
    fn test_parse_wrapped_and_bare() {
        let env = EnvOverlay::default();
        let c = ctx(Path::new("/work"), &env);

        let wrapped = json!({"mcpServers": {"fs": {"command": "mcp-fs"}}});
        let bare = json!({"fs": {"command": "mcp-fs"}});

        assert_eq!(parse_providers(&wrapped, &c), parse_providers(&bare, &c));
        assert_eq!(parse_providers(&bare, &c)[0].id, "fs");
    }

    #[test]
    fn test_stdio_entry_resolved() {
        let env = EnvOverlay::default();
        let c = ctx(Path::new("/work/app"), &env);
        let doc = json!({"mcpServers": {"files": {
            "type": "stdio",
            "command": "${userHome}/bin/files-server",
            "args": ["--root", "${workspaceFolder}"],
            "env": {"LOG": "debug"},
            "cwd": "tools"
        }}});

        let specs = parse_providers(&doc, &c);
        assert_eq!(specs.len(), 1);
        let Transport::Stdio(launch) = &specs[0].transport else {
            panic!("expected stdio");
        };
        assert_eq!(launch.command, "/home/dev/bin/files-server");
        assert_eq!(launch.args, vec!["--root", "/work/app"]);
        assert_eq!(launch.env.get("LOG").map(String::as_str), Some("debug"));
        assert_eq!(launch.cwd.as_deref(), Some(Path::new("/work/app/tools")));
    }

    #[test]
    fn test_env_file_merged_explicit_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("github.env"), "TOKEN=from-file\nORG=acme\n").unwrap();

        let env = EnvOverlay::default();
        let c = ctx(dir.path(), &env);
        let doc = json!({"github": {
            "command": "gh-mcp",
            "envFile": "${workspaceFolder}/github.env",
            "env": {"TOKEN": "explicit"}
        }});

        let specs = parse_providers(&doc, &c);
        let Transport::Stdio(launch) = &specs[0].transport else {
            panic!("expected stdio");
        };
        assert_eq!(launch.env.get("TOKEN").map(String::as_str), Some("explicit"));
        assert_eq!(launch.env.get("ORG").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_missing_env_file_is_not_fatal() {
        let env = EnvOverlay::default();
        let c = ctx(Path::new("/nonexistent"), &env);
        let doc = json!({"x": {"command": "x-mcp", "envFile": "missing.env"}});
        let specs = parse_providers(&doc, &c);
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn test_remote_and_disabled_and_malformed() {
        let env = EnvOverlay::default();
        let c = ctx(Path::new("/work"), &env);
        let doc = json!({"mcpServers": {
            "remote": {"type": "sse", "url": "https://mcp.example.com/sse"},
            "off": {"command": "x", "disabled": true},
            "broken": {"command": 42},
            "nocmd": {"type": "stdio"},
            "weird": {"type": "carrier-pigeon"}
        }});

        let specs = parse_providers(&doc, &c);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "remote");
        assert_eq!(
            specs[0].transport,
            Transport::Remote {
                kind: "sse".into(),
                url: Some("https://mcp.example.com/sse".into())
            }
        );
    }

    #[test]
    fn test_find_config_prefers_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp.json"), "{}").unwrap();
        assert_eq!(
            find_config_file(dir.path(), None),
            Some(dir.path().join("mcp.json"))
        );
    }

    #[test]
    fn test_find_config_explicit_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            find_config_file(dir.path(), Some(&dir.path().join("nope.json"))),
            None
        );
    }

    #[test]
    fn test_read_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_config_file(&path), Err(McpError::Config(_))));
    }
}
