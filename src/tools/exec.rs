//! Execution tools — sandboxed code runs and filtered shell commands.

use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use super::{str_arg, Tool};
use crate::metrics::SharedMetrics;
use crate::policy::CommandPolicy;

/// Combine a finished process's stdout and stderr the way the model sees it.
fn render_output(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        text.push_str(&format!("\nSTDERR: {stderr}"));
    }
    text
}

/// Run a snippet of Python in the workspace.
///
/// The code is written to a temp file and handed to the configured
/// interpreter; the temp file is removed when the handle drops.
pub struct RunCodeTool {
    python_bin: String,
    timeout: Duration,
}

impl RunCodeTool {
    pub fn new(python_bin: String, timeout: Duration) -> Self {
        Self {
            python_bin,
            timeout,
        }
    }
}

#[async_trait]
impl Tool for RunCodeTool {
    fn name(&self) -> &'static str {
        "code_execute"
    }

    fn description(&self) -> &'static str {
        "Execute Python code and return its output. Use this to test code or \
         compute results. The code runs with the workspace as its working directory."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The Python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn run(&self, args: &Value, workspace: &Path) -> String {
        let Some(code) = str_arg(args, "code") else {
            return "Error executing code: missing 'code' argument".to_string();
        };
        if code.trim().is_empty() {
            return "Error: code parameter is empty. Please provide actual code to execute."
                .to_string();
        }

        let mut file = match tempfile::Builder::new().suffix(".py").tempfile() {
            Ok(f) => f,
            Err(e) => return format!("Error executing code: {e}"),
        };
        if let Err(e) = file.write_all(code.as_bytes()) {
            return format!("Error executing code: {e}");
        }

        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.python_bin)
                .arg(file.path())
                .current_dir(workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Err(_) => "Code execution timed out".to_string(),
            Ok(Err(e)) => format!("Error executing code: {e}"),
            Ok(Ok(output)) => render_output(&output),
        }
    }
}

/// Run a shell command in the workspace, gated by the command policy.
pub struct ShellTool {
    policy: CommandPolicy,
    timeout: Duration,
    metrics: SharedMetrics,
}

impl ShellTool {
    pub fn new(policy: CommandPolicy, timeout: Duration, metrics: SharedMetrics) -> Self {
        Self {
            policy,
            timeout,
            metrics,
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn description(&self) -> &'static str {
        "Run a terminal command in the workspace. Destructive commands are blocked."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to run"
                }
            },
            "required": ["command"]
        })
    }

    async fn run(&self, args: &Value, workspace: &Path) -> String {
        let Some(command) = str_arg(args, "command") else {
            return "Error running command: missing 'command' argument".to_string();
        };

        if let Some(term) = self.policy.blocked_term(&command) {
            warn!(term, command = %command, "blocked shell command");
            self.metrics.inc_commands_blocked();
            return "Command blocked for safety reasons".to_string();
        }

        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&command)
                .current_dir(workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Err(_) => "Command timed out".to_string(),
            Ok(Err(e)) => format!("Error running command: {e}"),
            Ok(Ok(output)) => render_output(&output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AgentMetrics;
    use std::sync::Arc;

    fn shell() -> ShellTool {
        ShellTool::new(
            CommandPolicy::default_rules(),
            Duration::from_secs(5),
            Arc::new(AgentMetrics::new()),
        )
    }

    #[tokio::test]
    async fn denylisted_command_is_blocked() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = shell()
            .run(&json!({"command": "rm -rf /tmp/whatever"}), dir.path())
            .await;
        assert_eq!(out, "Command blocked for safety reasons");
    }

    #[tokio::test]
    async fn clean_command_runs_in_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let out = shell().run(&json!({"command": "ls"}), dir.path()).await;
        assert!(out.contains("marker.txt"));
    }

    #[tokio::test]
    async fn stderr_is_appended_to_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = shell()
            .run(&json!({"command": "echo out; echo err 1>&2"}), dir.path())
            .await;
        assert!(out.contains("out"));
        assert!(out.contains("STDERR: err"));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = ShellTool::new(
            CommandPolicy::default_rules(),
            Duration::from_millis(100),
            Arc::new(AgentMetrics::new()),
        );
        let out = tool.run(&json!({"command": "sleep 5"}), dir.path()).await;
        assert_eq!(out, "Command timed out");
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_error_string() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = RunCodeTool::new(
            "definitely-not-a-python-binary".to_string(),
            Duration::from_secs(5),
        );
        let out = tool.run(&json!({"code": "print('hi')"}), dir.path()).await;
        assert!(out.starts_with("Error executing code:"));
    }

    #[tokio::test]
    async fn empty_code_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = RunCodeTool::new("python3".to_string(), Duration::from_secs(5));
        let out = tool.run(&json!({"code": "   "}), dir.path()).await;
        assert!(out.contains("code parameter is empty"));
    }
}
