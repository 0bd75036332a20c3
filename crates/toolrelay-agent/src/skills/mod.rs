//! Skills: directories holding a `SKILL.md` that become `skill_{dir}` tools.
//!
//! ```text
//! ~/.toolrelay/skills/
//!   disk-usage/SKILL.md
//!   release-notes/SKILL.md
//! ```

pub mod executor;
pub mod parser;
pub mod tool;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use executor::{ScriptResult, ScriptRunner};
pub use parser::{CodeBlock, ScriptLanguage, Skill};
pub use tool::SkillTool;

use crate::tools::Tool;

/// Parse every `<dir>/<name>/SKILL.md`, sorted by directory name.
///
/// A missing directory yields nothing; unreadable files are skipped.
pub fn scan_skills(dir: &Path) -> Vec<Skill> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skills directory not readable");
            return Vec::new();
        }
    };

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let skill_file = path.join("SKILL.md");
        if !skill_file.is_file() {
            continue;
        }
        let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match std::fs::read_to_string(&skill_file) {
            Ok(content) => {
                debug!(name = dir_name, "discovered skill");
                skills.push(parser::parse_skill(dir_name, &content, skill_file));
            }
            Err(e) => warn!(path = %skill_file.display(), error = %e, "cannot read skill"),
        }
    }

    skills.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    skills
}

/// Build one tool per skill found in `dir`.
pub fn load_skill_tools(dir: &Path, runner: Arc<ScriptRunner>) -> Vec<Arc<dyn Tool>> {
    let skills = scan_skills(dir);
    if !skills.is_empty() {
        info!(dir = %dir.display(), count = skills.len(), "loaded skills");
    }
    skills
        .into_iter()
        .map(|skill| Arc::new(SkillTool::new(skill, runner.clone())) as Arc<dyn Tool>)
        .collect()
}
