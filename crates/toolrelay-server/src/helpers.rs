//! Shared CLI helpers — banner, tool listing, agent output printing.

use colored::Colorize;

use toolrelay_agent::{AgentOutput, ToolRegistry, ToolSource};
use toolrelay_core::utils::truncate_string;

/// Longest argument or result preview printed by `ask`.
const PREVIEW_CHARS: usize = 200;

/// Print the banner shown when the server starts.
pub fn print_banner(addr: &str, tool_count: usize) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Toolrelay".cyan().bold(), version.dimmed());
    println!(
        "  {} http://{}/api/chat  ({} tools)",
        "Listening:".bold(),
        addr,
        tool_count
    );
    println!("{}", "  Press Ctrl+C to stop.".dimmed());
    println!();
}

/// Print every registered tool grouped by where it came from.
pub fn print_tools(registry: &ToolRegistry) {
    println!();
    println!("{}", format!("Toolrelay tools ({})", registry.len()).cyan().bold());

    for source in [ToolSource::Local, ToolSource::Mcp, ToolSource::Skill] {
        let names: Vec<String> = registry
            .tool_names()
            .into_iter()
            .filter(|name| registry.source_of(name) == Some(source))
            .collect();

        println!();
        println!("  {}", source_label(source).bold());
        if names.is_empty() {
            println!("    {}", "(none)".dimmed());
            continue;
        }
        for name in names {
            let description = registry
                .get(&name)
                .map(|tool| first_line(tool.description()))
                .unwrap_or_default();
            println!("    {:<28} {}", name.green(), description.dimmed());
        }
    }
    println!();
}

/// Print the result of a one-shot agent run.
pub fn print_output(output: &AgentOutput) {
    println!();
    for call in &output.tool_calls {
        println!(
            "  {} {}({})",
            "→".yellow(),
            call.tool_name.yellow(),
            truncate_string(&call.args.to_string(), PREVIEW_CHARS).dimmed()
        );
        println!(
            "    {}",
            truncate_string(&call.result.to_string(), PREVIEW_CHARS).dimmed()
        );
    }
    if output.has_tool_calls {
        println!();
    }

    println!("{}", "Toolrelay".cyan().bold());
    if output.text.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{}", output.text);
    }
    println!();
}

fn source_label(source: ToolSource) -> &'static str {
    match source {
        ToolSource::Local => "Local",
        ToolSource::Mcp => "MCP providers",
        ToolSource::Skill => "Skills",
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_of_multiline_description() {
        assert_eq!(first_line("Run a skill.\nMore detail."), "Run a skill.");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn source_labels_are_distinct() {
        let labels = [
            source_label(ToolSource::Local),
            source_label(ToolSource::Mcp),
            source_label(ToolSource::Skill),
        ];
        assert_eq!(labels, ["Local", "MCP providers", "Skills"]);
    }
}
