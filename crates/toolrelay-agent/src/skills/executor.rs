//! Run skill snippets in a subprocess.
//!
//! Shell snippets go to `sh -c`. Everything else is written to a
//! `NamedTempFile` and handed to its interpreter; the file is removed when
//! the handle drops, whichever way the run ends.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use toolrelay_core::utils::truncate_string;
use tracing::{debug, info};

use super::parser::{CodeBlock, ScriptLanguage};

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 10_000;

/// Outcome of one snippet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScriptResult {
    pub index: usize,
    pub language: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptResult {
    fn ok(block: &CodeBlock, output: String) -> Self {
        Self {
            index: block.index,
            language: block.language.clone(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    fn failed(block: &CodeBlock, error: String) -> Self {
        Self {
            index: block.index,
            language: block.language.clone(),
            success: false,
            output: None,
            error: Some(error),
        }
    }
}

/// Executes snippets from the project root with a per-snippet timeout.
#[derive(Clone, Debug)]
pub struct ScriptRunner {
    working_dir: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(working_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            working_dir,
            timeout,
        }
    }

    /// Run one block. Never fails; every problem lands in the result.
    pub async fn run(&self, block: &CodeBlock) -> ScriptResult {
        let Some(language) = block.script_language() else {
            return ScriptResult::failed(
                block,
                format!("Language '{}' is not executable", block.language),
            );
        };

        info!(index = block.index, language = %language, "running skill snippet");
        match self.run_inner(language, &block.code).await {
            Ok(output) => ScriptResult::ok(block, output),
            Err(error) => ScriptResult::failed(block, error),
        }
    }

    /// Run blocks one after another; a failure does not stop the batch.
    pub async fn run_all<'a>(
        &self,
        blocks: impl IntoIterator<Item = &'a CodeBlock>,
    ) -> Vec<ScriptResult> {
        let mut results = Vec::new();
        for block in blocks {
            results.push(self.run(block).await);
        }
        results
    }

    async fn run_inner(&self, language: ScriptLanguage, code: &str) -> Result<String, String> {
        // The script file must outlive the child.
        let (mut command, _script_file) = match language {
            ScriptLanguage::Shell => (shell_command(code), None),
            _ => {
                let file = tempfile::Builder::new()
                    .prefix("toolrelay-skill-")
                    .suffix(language.extension())
                    .tempfile()
                    .map_err(|e| format!("Failed to create script file: {e}"))?;
                tokio::fs::write(file.path(), code)
                    .await
                    .map_err(|e| format!("Failed to write script file: {e}"))?;

                let mut cmd = interpreter_command(language);
                cmd.arg(file.path());
                (cmd, Some(file))
            }
        };

        let child = command
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start {language} interpreter: {e}"))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("Script failed: {e}")),
            Err(_) => {
                return Err(format!(
                    "Script timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        debug!(exit_code = code, "skill snippet finished");

        let mut parts = Vec::new();
        if !stdout.is_empty() {
            parts.push(stdout);
        }
        if !stderr.is_empty() {
            parts.push(format!("STDERR:\n{stderr}"));
        }
        let combined = if parts.is_empty() {
            "(no output)".to_string()
        } else {
            truncate_string(parts.join("\n").trim_end(), MAX_OUTPUT_LEN)
        };

        if output.status.success() {
            Ok(combined)
        } else {
            Err(format!("{combined}\nExit code: {code}"))
        }
    }
}

fn shell_command(code: &str) -> Command {
    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };
    let mut cmd = Command::new(shell);
    cmd.args([flag, code]);
    cmd
}

fn interpreter_command(language: ScriptLanguage) -> Command {
    match language {
        ScriptLanguage::Python => Command::new("python3"),
        ScriptLanguage::JavaScript => Command::new("node"),
        ScriptLanguage::TypeScript => {
            let mut cmd = Command::new("npx");
            cmd.arg("tsx");
            cmd
        }
        ScriptLanguage::Shell => Command::new("sh"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
