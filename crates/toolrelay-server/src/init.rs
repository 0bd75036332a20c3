//! `toolrelay init` — write a default config and create the skills directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use toolrelay_core::config::{get_config_path, save_config, Config};

/// Files and directories touched by `init`.
pub struct InitReport {
    pub config_path: PathBuf,
    pub config_created: bool,
    pub skills_dir: PathBuf,
}

/// Run the init command and print what it did.
pub fn run(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let report = init(config, config_path)?;

    println!();
    println!("{}", "Toolrelay — Setup".cyan().bold());
    println!();
    let verb = if report.config_created {
        "created config at"
    } else {
        "config already exists at"
    };
    println!("  {} {} {}", "✓".green(), verb, report.config_path.display());
    println!(
        "  {} skills dir at {}",
        "✓".green(),
        report.skills_dir.display()
    );
    println!();
    println!(
        "  {}",
        "Set OPENAI_API_KEY (or llm.apiKey) and run `toolrelay serve`.".dimmed()
    );
    println!();
    Ok(())
}

/// Write `config` unless a file already exists, then ensure the skills dir.
pub fn init(config: &Config, config_path: Option<&Path>) -> Result<InitReport> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    let config_created = !config_path.exists();
    if config_created {
        save_config(config, Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }

    let skills_dir = config.skills.dir_path();
    std::fs::create_dir_all(&skills_dir)
        .with_context(|| format!("failed to create {}", skills_dir.display()))?;

    Ok(InitReport {
        config_path,
        config_created,
        skills_dir,
    })
}
