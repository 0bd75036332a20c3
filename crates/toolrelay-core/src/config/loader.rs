//! Config loader — reads `~/.toolrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.toolrelay/config.json`
//! 3. Environment variables `TOOLRELAY_<SECTION>__<FIELD>` (override JSON),
//!    looked up in the process environment and then `<projectRoot>/.env`
//! 4. `OPENAI_API_KEY` when no API key is configured

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;
use crate::env_file::EnvOverlay;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given (or default) path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let mut config = load_config_from_path(&config_path);

    // The project root decides which `.env` applies; take it from the
    // process environment only.
    if let Ok(root) = std::env::var("TOOLRELAY_WORKSPACE__PROJECT_ROOT") {
        config.workspace.project_root = root;
    }
    let env = EnvOverlay::for_project(&config.workspace.project_root_path());
    apply_env_overrides(config, &env)
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `TOOLRELAY_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `TOOLRELAY_LLM__API_KEY`, `TOOLRELAY_LLM__API_BASE`, `TOOLRELAY_LLM__MODEL`
/// - `TOOLRELAY_LLM__MAX_TOKENS`, `TOOLRELAY_LLM__TEMPERATURE`
/// - `TOOLRELAY_AGENT__MAX_STEPS`
/// - `TOOLRELAY_SERVER__HOST`, `TOOLRELAY_SERVER__PORT`
/// - `TOOLRELAY_MCP__CONFIG_PATH`, `TOOLRELAY_SKILLS__DIR`
/// - `OPENAI_API_KEY` → `llm.api_key` when still empty
fn apply_env_overrides(mut config: Config, env: &EnvOverlay) -> Config {
    // LLM
    if let Some(val) = env.get("TOOLRELAY_LLM__API_KEY") {
        config.llm.api_key = val;
    }
    if let Some(val) = env.get("TOOLRELAY_LLM__API_BASE") {
        config.llm.api_base = val;
    }
    if let Some(val) = env.get("TOOLRELAY_LLM__MODEL") {
        config.llm.model = val;
    }
    if let Some(n) = parse_var::<u32>(env, "TOOLRELAY_LLM__MAX_TOKENS") {
        config.llm.max_tokens = n;
    }
    if let Some(t) = parse_var::<f64>(env, "TOOLRELAY_LLM__TEMPERATURE") {
        config.llm.temperature = t;
    }
    if config.llm.api_key.is_empty() {
        if let Some(val) = env.get("OPENAI_API_KEY") {
            config.llm.api_key = val;
        }
    }

    // Agent
    if let Some(n) = parse_var::<u32>(env, "TOOLRELAY_AGENT__MAX_STEPS") {
        config.agent.max_steps = n;
    }

    // Server
    if let Some(val) = env.get("TOOLRELAY_SERVER__HOST") {
        config.server.host = val;
    }
    if let Some(p) = parse_var::<u16>(env, "TOOLRELAY_SERVER__PORT") {
        config.server.port = p;
    }

    // Capability sources
    if let Some(val) = env.get("TOOLRELAY_MCP__CONFIG_PATH") {
        config.mcp.config_path = Some(val);
    }
    if let Some(val) = env.get("TOOLRELAY_SKILLS__DIR") {
        config.skills.dir = val;
    }

    config
}

fn parse_var<T: std::str::FromStr>(env: &EnvOverlay, name: &str) -> Option<T> {
    let raw = env.get(name)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
