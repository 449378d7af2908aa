//! Workspace path handling shared by the file tools and the REST file browser.
//!
//! Every path the model or the UI supplies is resolved against the task's
//! workspace directory and may not escape it. The daemon's own working
//! directory never changes.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

/// Resolve a requested path inside `root`.
///
/// Rejects absolute paths and any `..` component. Returns the joined path;
/// the file itself may or may not exist.
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf> {
    let requested_path = Path::new(requested);
    for component in requested_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => bail!("path '{requested}' escapes the workspace"),
            Component::RootDir | Component::Prefix(_) => {
                bail!("absolute path '{requested}' is not allowed")
            }
        }
    }
    Ok(root.join(requested_path))
}

/// Recursively list files under `root` as sorted workspace-relative paths.
///
/// Hidden entries (dot-prefixed) are skipped. A missing root yields an
/// empty list rather than an error — the UI shows "no files" for it.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files);
    files.sort();
    files
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_paths() {
        let root = Path::new("/work");
        let path = resolve(root, "src/main.rs").unwrap();
        assert_eq!(path, PathBuf::from("/work/src/main.rs"));
    }

    #[test]
    fn resolve_rejects_escapes() {
        let root = Path::new("/work");
        assert!(resolve(root, "../outside.txt").is_err());
        assert!(resolve(root, "src/../../etc/passwd").is_err());
        assert!(resolve(root, "/etc/passwd").is_err());
    }

    #[test]
    fn list_files_walks_recursively_and_skips_hidden() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();

        let files = list_files(dir.path());
        assert_eq!(files, vec!["README.md".to_string(), "src/lib.rs".to_string()]);
    }

    #[test]
    fn list_files_on_missing_root_is_empty() {
        assert!(list_files(Path::new("/nonexistent-forged-test")).is_empty());
    }
}
