//! `${...}` substitution for provider config strings.
//!
//! Recognized tokens:
//! - `${env:NAME}` — environment variable (process env, then project `.env`)
//! - `${userHome}` — the user's home directory
//! - `${workspaceFolder}` — the project root
//! - `${workspaceFolderBasename}` — the project root's final component
//!
//! Anything unresolved becomes the empty string.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use toolrelay_core::EnvOverlay;
use tracing::debug;

/// Values available to templates.
pub struct TemplateContext<'a> {
    pub workspace: &'a Path,
    pub home: Option<PathBuf>,
    pub env: &'a EnvOverlay,
}

impl<'a> TemplateContext<'a> {
    pub fn new(workspace: &'a Path, env: &'a EnvOverlay) -> Self {
        Self {
            workspace,
            home: toolrelay_core::utils::home_dir(),
            env,
        }
    }

    fn lookup(&self, token: &str) -> Option<String> {
        if let Some(name) = token.strip_prefix("env:") {
            return self.env.get(name);
        }
        match token {
            "userHome" => self.home.as_ref().map(|h| h.to_string_lossy().to_string()),
            "workspaceFolder" => Some(self.workspace.to_string_lossy().to_string()),
            "workspaceFolderBasename" => self
                .workspace
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            _ => None,
        }
    }
}

fn token_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").ok()).as_ref()
}

/// Resolve every `${...}` token in `input`.
pub fn resolve_template(input: &str, ctx: &TemplateContext<'_>) -> String {
    let Some(re) = token_regex().filter(|_| input.contains("${")) else {
        return input.to_string();
    };

    re.replace_all(input, |caps: &Captures<'_>| {
        let token = &caps[1];
        ctx.lookup(token).unwrap_or_else(|| {
            debug!(token, "unresolved template token");
            String::new()
        })
    })
    .into_owned()
}

/// Resolve templates in every string inside a JSON value, in place.
pub fn resolve_value(value: &mut Value, ctx: &TemplateContext<'_>) {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = resolve_template(s, ctx);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_value(v, ctx)),
        Value::Object(map) => map.values_mut().for_each(|v| resolve_value(v, ctx)),
        _ => {}
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvOverlay {
        EnvOverlay::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn ctx<'a>(workspace: &'a Path, env: &'a EnvOverlay) -> TemplateContext<'a> {
        TemplateContext {
            workspace,
            home: Some(PathBuf::from("/home/dev")),
            env,
        }
    }

    #[test]
    fn test_plain_string_unchanged() {
        let env = env(&[]);
        let c = ctx(Path::new("/work/app"), &env);
        assert_eq!(resolve_template("no tokens here", &c), "no tokens here");
        assert_eq!(resolve_template("$HOME {braces}", &c), "$HOME {braces}");
    }

    #[test]
    fn test_idempotent_without_tokens() {
        let env = env(&[]);
        let c = ctx(Path::new("/work/app"), &env);
        let once = resolve_template("/usr/bin/node", &c);
        assert_eq!(resolve_template(&once, &c), once);
    }

    #[test]
    fn test_user_home() {
        let env = env(&[]);
        let c = ctx(Path::new("/work/app"), &env);
        assert_eq!(resolve_template("${userHome}/x", &c), "/home/dev/x");
    }

    #[test]
    fn test_all_tokens_combined() {
        let env = env(&[("TOOLRELAY_TEMPLATE_TEST_TOKEN", "s3cret")]);
        let c = ctx(Path::new("/work/app"), &env);
        let out = resolve_template(
            "${userHome}|${workspaceFolder}|${workspaceFolderBasename}|${env:TOOLRELAY_TEMPLATE_TEST_TOKEN}",
            &c,
        );
        assert_eq!(out, "/home/dev|/work/app|app|s3cret");
    }

    #[test]
    fn test_unresolved_become_empty() {
        let env = env(&[]);
        let c = ctx(Path::new("/work/app"), &env);
        assert_eq!(
            resolve_template("a${env:TOOLRELAY_TEMPLATE_TEST_MISSING}b${bogus}c", &c),
            "abc"
        );
    }

    #[test]
    fn test_resolve_value_recurses() {
        let env = env(&[("TOOLRELAY_TEMPLATE_TEST_KEY", "k")]);
        let c = ctx(Path::new("/work/app"), &env);
        let mut value = json!({
            "command": "${workspaceFolder}/bin/server",
            "args": ["--root", "${workspaceFolder}", 3],
            "env": { "KEY": "${env:TOOLRELAY_TEMPLATE_TEST_KEY}" },
            "disabled": false
        });
        resolve_value(&mut value, &c);
        assert_eq!(value["command"], "/work/app/bin/server");
        assert_eq!(value["args"], json!(["--root", "/work/app", 3]));
        assert_eq!(value["env"]["KEY"], "k");
        assert_eq!(value["disabled"], false);
    }
}
