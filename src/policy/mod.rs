//! Command policy — denylist filter for the terminal tool.
//!
//! `CommandPolicy` is loaded once at daemon start. The built-in denylist is
//! always active; `[policy] denied_commands` in config.toml and an optional
//! `{data_dir}/policies/denied-commands.json` file extend it. Matching is
//! case-insensitive substring — any command that merely *contains* a denied
//! term is blocked.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Commands that are never allowed through the terminal tool.
const DEFAULT_DENIED: &[&str] = &["rm", "del", "format", "fdisk", "mkfs"];

/// Denylist filter consulted before every shell command.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    denied: Vec<String>,
}

/// JSON shape expected in `denied-commands.json`.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    denied: Vec<String>,
}

impl CommandPolicy {
    /// Built-in denylist only.
    pub fn default_rules() -> Self {
        Self {
            denied: DEFAULT_DENIED.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Built-in denylist plus extra terms from configuration.
    pub fn with_extensions(extra: &[String]) -> Self {
        let mut policy = Self::default_rules();
        for term in extra {
            let term = term.to_lowercase();
            if !term.is_empty() && !policy.denied.contains(&term) {
                policy.denied.push(term);
            }
        }
        policy
    }

    /// Load extra denied terms from a JSON file on top of `base`.
    ///
    /// Missing or malformed files emit a warning and return `base` unchanged.
    pub fn load_from_json(base: Self, path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return base,
        };

        let file: PolicyFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), err = %e, "denied-commands.json parse error — ignoring");
                return base;
            }
        };

        let mut policy = base;
        for term in file.denied {
            let term = term.to_lowercase();
            if !term.is_empty() && !policy.denied.contains(&term) {
                policy.denied.push(term);
            }
        }
        policy
    }

    /// Return the denied term contained in `command`, if any.
    pub fn blocked_term(&self, command: &str) -> Option<&str> {
        let lowered = command.to_lowercase();
        self.denied
            .iter()
            .find(|term| lowered.contains(term.as_str()))
            .map(|s| s.as_str())
    }

    /// True when the command contains any denied term.
    pub fn is_blocked(&self, command: &str) -> bool {
        self.blocked_term(command).is_some()
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_builtin_terms() {
        let policy = CommandPolicy::default_rules();
        assert!(policy.is_blocked("rm -rf /"));
        assert!(policy.is_blocked("mkfs.ext4 /dev/sda1"));
        assert!(policy.is_blocked("fdisk -l"));
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let policy = CommandPolicy::default_rules();
        assert!(policy.is_blocked("RM -rf /tmp/x"));
        // Substring semantics: "del" inside "deluge" still blocks.
        assert!(policy.is_blocked("deluge-console"));
        assert_eq!(policy.blocked_term("echo DEL"), Some("del"));
    }

    #[test]
    fn allows_clean_commands() {
        let policy = CommandPolicy::default_rules();
        assert!(!policy.is_blocked("ls -la"));
        assert!(!policy.is_blocked("cargo build"));
        assert!(!policy.is_blocked("echo hello"));
    }

    #[test]
    fn config_extensions_are_applied() {
        let policy = CommandPolicy::with_extensions(&["shutdown".to_string()]);
        assert!(policy.is_blocked("shutdown -h now"));
        assert!(policy.is_blocked("rm x")); // built-ins survive
    }

    #[test]
    fn json_file_extends_denylist() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("denied-commands.json");
        std::fs::write(&path, r#"{"denied": ["reboot"]}"#).unwrap();

        let policy = CommandPolicy::load_from_json(CommandPolicy::default_rules(), &path);
        assert!(policy.is_blocked("sudo reboot"));
    }

    #[test]
    fn malformed_json_keeps_base_rules() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("denied-commands.json");
        std::fs::write(&path, "not json").unwrap();

        let policy = CommandPolicy::load_from_json(CommandPolicy::default_rules(), &path);
        assert!(policy.is_blocked("rm x"));
        assert!(!policy.is_blocked("echo hello"));
    }
}
