//! Utility helpers — path resolution and string manipulation.

use std::path::{Path, PathBuf};

/// Get the Toolrelay data directory (e.g. `~/.toolrelay/`).
pub fn get_data_path() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".toolrelay")
}

/// Get the default skills directory (e.g. `~/.toolrelay/skills/`).
pub fn get_default_skills_path() -> PathBuf {
    get_data_path().join("skills")
}

/// Get the user-level MCP config path (e.g. `~/.toolrelay/mcp.json`).
pub fn get_user_mcp_config_path() -> PathBuf {
    get_data_path().join("mcp.json")
}

/// The current user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest),
        None => PathBuf::from(path),
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
///
/// Does not touch the filesystem, so it works for paths that do not exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
        assert!(result.len() <= 15);
    }

    #[test]
    fn test_truncate_unicode() {
        let result = truncate_string("こんにちは世界です", 5);
        assert_eq!(result, "こん...");
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/test/path");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.to_str().unwrap().ends_with("test/path"));
    }

    #[test]
    fn test_expand_home_absolute() {
        let expanded = expand_home("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_normalize_path_folds_parents() {
        assert_eq!(
            normalize_path(Path::new("/root/project/./a/../b.txt")),
            PathBuf::from("/root/project/b.txt")
        );
        assert_eq!(
            normalize_path(Path::new("/root/project/../../etc/passwd")),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn test_data_path_ends_with_toolrelay() {
        assert!(get_data_path().ends_with(".toolrelay"));
        assert!(get_default_skills_path().ends_with(".toolrelay/skills"));
        assert!(get_user_mcp_config_path().ends_with(".toolrelay/mcp.json"));
    }
}
