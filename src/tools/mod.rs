//! Agent tools — the capabilities exposed to the model.
//!
//! Four tools: `file_read`, `file_write`, `code_execute`, `terminal`.
//! Every tool returns its outcome as a string, including failures
//! ("Error reading file: ..."), so the model can observe and recover.
//! Nothing here returns `Err` to the agent loop.

pub mod exec;
pub mod fs;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::AgentConfig;
use crate::metrics::SharedMetrics;
use crate::ollama::{self, ToolCall};
use crate::policy::CommandPolicy;

/// A named capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;
    /// Execute with the given arguments inside `workspace`.
    ///
    /// Failures come back as error strings, never as panics or `Err`.
    async fn run(&self, args: &Value, workspace: &Path) -> String;
}

/// Pull a string argument out of a tool-call arguments object.
pub(crate) fn str_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Owns the tool set, produces the specs advertised to the model, and
/// dispatches tool calls by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    metrics: SharedMetrics,
}

impl ToolRegistry {
    /// Build the standard four-tool registry.
    pub fn new(agent_config: &AgentConfig, policy: CommandPolicy, metrics: SharedMetrics) -> Self {
        let timeout = std::time::Duration::from_secs(agent_config.tool_timeout_secs);
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(fs::ReadFileTool),
            Arc::new(fs::WriteFileTool),
            Arc::new(exec::RunCodeTool::new(
                agent_config.python_bin.clone(),
                timeout,
            )),
            Arc::new(exec::ShellTool::new(policy, timeout, metrics.clone())),
        ];
        Self { tools, metrics }
    }

    /// Tool definitions in the shape Ollama's chat API expects.
    pub fn specs(&self) -> Vec<ollama::Tool> {
        self.tools
            .iter()
            .map(|t| ollama::Tool::function(t.name(), t.description(), t.parameters()))
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Route a tool call to its implementation.
    ///
    /// Unknown tool names come back as an error string the model can see.
    pub async fn dispatch(&self, call: &ToolCall, workspace: &Path) -> String {
        self.metrics.inc_tool_calls();
        let name = call.function.name.as_str();
        debug!(tool = name, "dispatching tool call");

        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.run(&call.function.arguments, workspace).await,
            None => format!("Error: unknown tool '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AgentMetrics;
    use crate::ollama::FunctionCall;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(
            &AgentConfig::default(),
            CommandPolicy::default_rules(),
            Arc::new(AgentMetrics::new()),
        )
    }

    #[test]
    fn registry_exposes_four_tools() {
        let reg = registry();
        assert_eq!(
            reg.names(),
            vec!["file_read", "file_write", "code_execute", "terminal"]
        );
        let specs = reg.specs();
        assert_eq!(specs.len(), 4);
        assert!(specs.iter().all(|s| s.tool_type == "function"));
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_string() {
        let reg = registry();
        let call = ToolCall {
            function: FunctionCall {
                name: "launch_rockets".to_string(),
                arguments: serde_json::json!({}),
            },
        };
        let dir = tempfile::TempDir::new().unwrap();
        let out = reg.dispatch(&call, dir.path()).await;
        assert!(out.contains("unknown tool"));
    }
}
