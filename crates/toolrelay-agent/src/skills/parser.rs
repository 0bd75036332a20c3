//! `SKILL.md` parsing: frontmatter plus fenced code blocks.
//!
//! ~~~text
//! ---
//! name: disk-usage
//! description: "Report disk usage for the project"
//! ---
//!
//! # Disk usage
//!
//! ```bash
//! du -sh .
//! ```
//! ~~~

use std::fmt;
use std::path::PathBuf;

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// Interpreters a snippet can be run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptLanguage {
    Shell,
    Python,
    JavaScript,
    TypeScript,
}

impl ScriptLanguage {
    /// Map a fence tag to a runnable language. An empty tag means shell.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "" | "bash" | "sh" | "shell" | "zsh" => Some(Self::Shell),
            "python" | "python3" | "py" => Some(Self::Python),
            "javascript" | "js" | "node" => Some(Self::JavaScript),
            "typescript" | "ts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// File suffix for the temporary script file.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Shell => ".sh",
            Self::Python => ".py",
            Self::JavaScript => ".js",
            Self::TypeScript => ".ts",
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shell => "shell",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        })
    }
}

/// One fenced block, in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlock {
    pub index: usize,
    /// Fence tag as written (lowercased), possibly empty.
    pub language: String,
    pub code: String,
}

impl CodeBlock {
    pub fn script_language(&self) -> Option<ScriptLanguage> {
        ScriptLanguage::from_tag(&self.language)
    }

    pub fn is_executable(&self) -> bool {
        self.script_language().is_some()
    }
}

/// A parsed skill directory.
#[derive(Clone, Debug)]
pub struct Skill {
    /// Directory name; the tool is `skill_{dir_name}`.
    pub dir_name: String,
    /// Frontmatter `name`, falling back to the directory name.
    pub name: String,
    pub description: Option<String>,
    /// Markdown body with frontmatter removed.
    pub instructions: String,
    pub code_blocks: Vec<CodeBlock>,
    pub path: PathBuf,
}

impl Skill {
    pub fn has_executable_scripts(&self) -> bool {
        self.code_blocks.iter().any(CodeBlock::is_executable)
    }

    pub fn executable_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.code_blocks.iter().filter(|b| b.is_executable())
    }
}

// ─────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────

/// Parse the contents of a `SKILL.md`.
pub fn parse_skill(dir_name: &str, content: &str, path: PathBuf) -> Skill {
    let content = content.replace("\r\n", "\n");
    let frontmatter = parse_frontmatter(&content).unwrap_or_default();
    let field = |key: &str| {
        frontmatter
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| unquote(v).to_string())
            .filter(|v| !v.is_empty())
    };

    let body = strip_frontmatter(&content).trim().to_string();
    let code_blocks = extract_code_blocks(&body);

    Skill {
        dir_name: dir_name.to_string(),
        name: field("name").unwrap_or_else(|| dir_name.to_string()),
        description: field("description"),
        instructions: body,
        code_blocks,
        path,
    }
}

/// Parse `key: value` lines between leading `---` delimiters.
pub fn parse_frontmatter(content: &str) -> Option<Vec<(String, String)>> {
    let after_first = content.strip_prefix("---")?;
    let end = after_first.find("\n---")?;
    let block = &after_first[..end];

    let pairs = block
        .lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect();

    Some(pairs)
}

/// Remove leading frontmatter, if any.
pub fn strip_frontmatter(content: &str) -> &str {
    let Some(after_first) = content.strip_prefix("---") else {
        return content;
    };
    match after_first.find("\n---") {
        Some(end) => {
            let rest = &after_first[end + 4..];
            // Drop the remainder of the closing delimiter line.
            match rest.find('\n') {
                Some(nl) => &rest[nl + 1..],
                None => "",
            }
        }
        None => content,
    }
}

/// Collect every fenced (```) block. An unterminated fence runs to the end.
pub fn extract_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        match current.take() {
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    let tag = info.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
                    current = Some((tag, Vec::new()));
                }
            }
            Some((tag, lines)) if trimmed.starts_with("```") && trimmed.trim_matches('`').trim().is_empty() => {
                push_block(&mut blocks, tag, &lines);
            }
            Some((tag, mut lines)) => {
                lines.push(line);
                current = Some((tag, lines));
            }
        }
    }

    if let Some((tag, lines)) = current {
        push_block(&mut blocks, tag, &lines);
    }
    blocks
}

fn push_block(blocks: &mut Vec<CodeBlock>, language: String, lines: &[&str]) {
    blocks.push(CodeBlock {
        index: blocks.len(),
        language,
        code: lines.join("\n").trim().to_string(),
    });
}

fn unquote(v: &str) -> &str {
    let v = v.trim();
    for q in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
