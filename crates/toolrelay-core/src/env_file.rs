//! `.env` file parsing and environment lookup with a file overlay.
//!
//! Used for the project-level `.env` (model credentials) and for the
//! `envFile` field of MCP provider entries.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

/// Parse `KEY=value` lines.
///
/// Lines are trimmed; blank lines and `#` comments are skipped; a single pair
/// of matching surrounding quotes (`"` or `'`) is stripped from the value.
/// Lines without `=` or with an empty key are ignored.
pub fn parse_env(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load and parse an env file. A missing or unreadable file logs a warning
/// and yields no variables.
pub fn load_env_file(path: &Path) -> HashMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let vars = parse_env(&content);
            debug!(path = %path.display(), count = vars.len(), "loaded env file");
            vars
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "env file not loaded");
            HashMap::new()
        }
    }
}

// ─────────────────────────────────────────────
// EnvOverlay
// ─────────────────────────────────────────────

/// Read-only view of the process environment with a fallback overlay.
///
/// The process environment wins; the overlay only fills in names that are
/// unset. The process environment is never mutated.
#[derive(Clone, Debug, Default)]
pub struct EnvOverlay {
    overlay: HashMap<String, String>,
}

impl EnvOverlay {
    /// Overlay with explicit variables.
    pub fn new(overlay: HashMap<String, String>) -> Self {
        Self { overlay }
    }

    /// Overlay loaded from `<project_root>/.env`, if present.
    pub fn for_project(project_root: &Path) -> Self {
        let path = project_root.join(".env");
        if path.is_file() {
            Self::new(load_env_file(&path))
        } else {
            Self::default()
        }
    }

    /// Look up a variable: process environment first, then the overlay.
    pub fn get(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .or_else(|| self.overlay.get(name).cloned())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
