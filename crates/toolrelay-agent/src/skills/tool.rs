//! `skill_{dir}` tools.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::executor::ScriptRunner;
use super::parser::{CodeBlock, Skill};
use crate::tools::base::{optional_bool, optional_i64, optional_string, require_string, Tool};

/// Exposes one skill to the model.
///
/// By default the tool hands back the skill's instructions and code blocks.
/// With `executeScript` it runs the executable snippets instead.
pub struct SkillTool {
    tool_name: String,
    description: String,
    skill: Skill,
    runner: Arc<ScriptRunner>,
}

impl SkillTool {
    pub fn new(skill: Skill, runner: Arc<ScriptRunner>) -> Self {
        let mut description = skill
            .description
            .clone()
            .unwrap_or_else(|| format!("Skill: {}", skill.name));
        if skill.has_executable_scripts() {
            description.push_str(" (has executable scripts; set executeScript to run them)");
        }

        Self {
            tool_name: format!("skill_{}", skill.dir_name),
            description,
            skill,
            runner,
        }
    }

    fn describe(&self, task: &str, context: Option<String>) -> Value {
        let code_blocks: Vec<Value> = self
            .skill
            .code_blocks
            .iter()
            .map(|b| {
                json!({
                    "index": b.index,
                    "language": b.language,
                    "executable": b.is_executable(),
                    "code": b.code,
                })
            })
            .collect();

        json!({
            "success": true,
            "skill": self.skill.name,
            "task": task,
            "context": context,
            "instructions": self.skill.instructions,
            "codeBlocks": code_blocks,
            "hasExecutableScripts": self.skill.has_executable_scripts(),
        })
    }

    fn select_block(&self, index: i64) -> Result<&CodeBlock, String> {
        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.skill.code_blocks.get(i))
            .ok_or_else(|| {
                format!(
                    "scriptIndex {index} is out of range (skill has {} code blocks)",
                    self.skill.code_blocks.len()
                )
            })?;
        if !block.is_executable() {
            return Err(format!(
                "Code block {index} ('{}') is not executable",
                block.language
            ));
        }
        Ok(block)
    }
}

#[async_trait]
impl Tool for SkillTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "What you want to accomplish with this skill"
                },
                "context": {
                    "type": "string",
                    "description": "Additional context for the task"
                },
                "executeScript": {
                    "type": "boolean",
                    "description": "Run the skill's executable code blocks instead of returning them"
                },
                "scriptIndex": {
                    "type": "integer",
                    "description": "Run only the code block with this index"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let task = require_string(&params, "task")?;
        let context = optional_string(&params, "context");

        if !optional_bool(&params, "executeScript") || !self.skill.has_executable_scripts() {
            return Ok(self.describe(&task, context));
        }

        let results = match optional_i64(&params, "scriptIndex") {
            Some(index) => match self.select_block(index) {
                Ok(block) => vec![self.runner.run(block).await],
                Err(error) => return Ok(json!({ "success": false, "error": error })),
            },
            None => self.runner.run_all(self.skill.executable_blocks()).await,
        };

        Ok(json!({
            "success": results.iter().all(|r| r.success),
            "skill": self.skill.name,
            "task": task,
            "executionResults": results,
        }))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
