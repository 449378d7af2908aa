//! File tools — read and write inside the task workspace.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{str_arg, Tool};
use crate::workspace;

/// Read a UTF-8 file from the workspace.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "file_read"
    }

    fn description(&self) -> &'static str {
        "Read the contents of a file. The path is relative to the workspace."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative path of the file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, args: &Value, workspace: &Path) -> String {
        let Some(path) = str_arg(args, "path") else {
            return "Error reading file: missing 'path' argument".to_string();
        };

        let resolved = match workspace::resolve(workspace, &path) {
            Ok(p) => p,
            Err(e) => return format!("Error reading file: {e}"),
        };

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => format!("Error reading file: {e}"),
        }
    }
}

/// Write content to a file in the workspace, creating parent directories.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "file_write"
    }

    fn description(&self) -> &'static str {
        "Write content to a file. The path is relative to the workspace; \
         parent directories are created as needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Full file content"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn run(&self, args: &Value, workspace: &Path) -> String {
        let Some(path) = str_arg(args, "path") else {
            return "Error writing file: missing 'path' argument".to_string();
        };
        let Some(content) = str_arg(args, "content") else {
            return "Error writing file: missing 'content' argument".to_string();
        };

        let resolved = match workspace::resolve(workspace, &path) {
            Ok(p) => p,
            Err(e) => return format!("Error writing file: {e}"),
        };

        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return format!("Error writing file: {e}");
            }
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => format!("Successfully wrote to {path}"),
            Err(e) => format!("Error writing file: {e}"),
        }
    }
}
