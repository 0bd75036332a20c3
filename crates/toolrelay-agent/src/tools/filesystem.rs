//! Filesystem tools — read, write, delete.
//!
//! Every path is resolved against the project root and must stay inside it.
//! A rejected path fails before any filesystem mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use toolrelay_core::utils::normalize_path;

use super::base::{require_string, Tool};

// ─────────────────────────────────────────────
// Shared path helper
// ─────────────────────────────────────────────

/// Resolve a user-supplied path inside `root`.
///
/// Relative paths are joined onto `root`. `..` segments are folded lexically
/// and the deepest existing ancestor is canonicalized, so symlinks pointing
/// out of the root are caught even for files that do not exist yet.
pub fn resolve_path(path: &str, root: &Path) -> anyhow::Result<PathBuf> {
    if path.trim().is_empty() {
        anyhow::bail!("Path must not be empty");
    }

    let root_canon = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root_canon.join(candidate)
    };
    let normalized = normalize_path(&joined);

    // Canonicalize the longest existing prefix, then re-attach the rest.
    let mut existing = normalized.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }

    if !resolved.starts_with(&root_canon) {
        anyhow::bail!(
            "Access denied: path '{}' is outside the project root '{}'",
            path,
            root_canon.display()
        );
    }

    Ok(resolved)
}

/// Path relative to the root, for results shown to the model.
fn display_path(path: &Path, root: &Path) -> String {
    let root_canon = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    path.strip_prefix(&root_canon)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn path_parameter(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": description
            }
        },
        "required": ["path"]
    })
}

// ─────────────────────────────────────────────
// ReadFileTool
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a file.
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the text content of a file in the project."
    }

    fn parameters(&self) -> Value {
        path_parameter("Path to the file, relative to the project root")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let path_str = require_string(&params, "path")?;
        let path = resolve_path(&path_str, &self.root)?;

        if !path.exists() {
            anyhow::bail!("File not found: {path_str}");
        }
        if !path.is_file() {
            anyhow::bail!("Not a file: {path_str}");
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {path_str}: {e}"))?;
        Ok(json!({
            "path": display_path(&path, &self.root),
            "size": content.len(),
            "content": content,
        }))
    }
}

// ─────────────────────────────────────────────
// WriteFileTool
// ─────────────────────────────────────────────

/// Creates or overwrites a file with the given content.
pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the project, creating it if it doesn't exist or \
         overwriting it if it does. Parent directories are created automatically."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path for the file, relative to the project root"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let path_str = require_string(&params, "path")?;
        let content = require_string(&params, "content")?;
        let path = resolve_path(&path_str, &self.root)?;

        if path.is_dir() {
            anyhow::bail!("Is a directory: {path_str}");
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create directory for {path_str}: {e}"))?;
        }

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {path_str}: {e}"))?;
        Ok(json!({
            "path": display_path(&path, &self.root),
            "bytesWritten": content.len(),
        }))
    }
}

// ─────────────────────────────────────────────
// DeleteFileTool
// ─────────────────────────────────────────────

/// Deletes a single file. Directories are refused.
pub struct DeleteFileTool {
    root: PathBuf,
}

impl DeleteFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file in the project. Directories cannot be deleted."
    }

    fn parameters(&self) -> Value {
        path_parameter("Path to the file to delete, relative to the project root")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let path_str = require_string(&params, "path")?;
        let path = resolve_path(&path_str, &self.root)?;

        if !path.exists() {
            anyhow::bail!("File not found: {path_str}");
        }
        if path.is_dir() {
            anyhow::bail!("Refusing to delete directory: {path_str}");
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete {path_str}: {e}"))?;
        Ok(json!({
            "path": display_path(&path, &self.root),
            "deleted": true,
        }))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
