//! The coding agent — a chat→tool-dispatch loop over Ollama.
//!
//! The model plans and decides tool use; this loop only routes tool calls,
//! feeds results back, and enforces the iteration budget. One task runs to
//! completion before the next starts.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::memory::store::MemoryStore;
use crate::metrics::SharedMetrics;
use crate::ollama::{parse_tool_calls_from_text, ChatClient, ChatMessage, OllamaError};
use crate::tools::ToolRegistry;

const SYSTEM_PROMPT: &str = "\
You are an expert coding assistant that can read, write, and modify code files.
You have access to tools for file operations, code execution, and terminal commands.

Your capabilities:
- Read and analyze existing code
- Write new code or modify existing code
- Execute code safely to test it
- Run terminal commands (with safety restrictions)

Guidelines:
1. Always plan your approach before taking action
2. Use tools when needed - don't assume file contents
3. Explain your reasoning clearly
4. Be safe - avoid destructive operations
5. Iterate until the task is complete
6. Provide clear explanations of changes made

When working on tasks:
- First understand the current codebase
- Plan the changes needed
- Implement changes step by step
- Test your changes
- Explain what was done

Remember: you can use multiple tools in sequence to accomplish complex tasks.";

/// What a task run hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub result: String,
    pub logs: Vec<String>,
}

pub struct CodingAgent {
    chat: ChatClient,
    registry: ToolRegistry,
    memory: Arc<MemoryStore>,
    metrics: SharedMetrics,
    model: String,
    max_iterations: usize,
    history_limit: usize,
    context_snippets: usize,
    workspace_root: PathBuf,
    /// Conversation carried across tasks, oldest first. Locking this for the
    /// whole run is what serializes task execution.
    history: Mutex<VecDeque<ChatMessage>>,
}

impl CodingAgent {
    pub fn new(
        config: &DaemonConfig,
        chat: ChatClient,
        registry: ToolRegistry,
        memory: Arc<MemoryStore>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            chat,
            registry,
            memory,
            metrics,
            model: config.ollama.model.clone(),
            max_iterations: config.agent.max_iterations,
            history_limit: config.agent.history_limit,
            context_snippets: config.memory.context_snippets,
            workspace_root: config.workspace_root.clone(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Run a coding task to completion.
    ///
    /// Never fails: every error is stringified into `result` so the caller
    /// (and the UI) always gets something to show.
    pub async fn run_task(&self, task: &str, workspace_path: Option<&str>) -> TaskOutcome {
        let mut logs = Vec::new();
        let mut history = self.history.lock().await;

        let workspace = self.select_workspace(workspace_path, &mut logs);

        if let Err(e) = self
            .memory
            .add(
                &format!("Task: {task}"),
                json!({
                    "type": "task",
                    "workspace": workspace.display().to_string(),
                }),
            )
            .await
        {
            warn!(err = %e, "failed to store task in memory");
        }

        let context = self.memory_context(task).await;
        let mut system = SYSTEM_PROMPT.to_string();
        if !context.is_empty() {
            system.push_str("\n\n");
            system.push_str(&context);
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().cloned());
        let user_prompt = format!("Task: {task}\n\nPlease complete this task step by step.");
        messages.push(ChatMessage::user(user_prompt.clone()));

        logs.push("Starting agent execution...".to_string());
        info!(model = %self.model, "starting agent task");

        self.metrics.inc_tasks_executed();

        let result = match self.run_loop(&mut messages, &workspace, &mut logs).await {
            Ok(result) => {
                logs.push("Agent execution completed".to_string());

                if let Err(e) = self
                    .memory
                    .add(
                        &format!("Result: {result}"),
                        json!({"type": "result", "task": task}),
                    )
                    .await
                {
                    warn!(err = %e, "failed to store result in memory");
                }

                // Carry the exchange into the next task's context.
                history.push_back(ChatMessage::user(user_prompt));
                history.push_back(ChatMessage::assistant(result.clone()));
                while history.len() > self.history_limit {
                    history.pop_front();
                }

                result
            }
            Err(e) => {
                self.metrics.inc_tasks_failed();
                let message = format!("Error during task execution: {e}");
                warn!(err = %e, "agent task failed");
                logs.push(message.clone());
                message
            }
        };

        TaskOutcome { result, logs }
    }

    /// The dispatch loop: chat until the model stops calling tools.
    async fn run_loop(
        &self,
        messages: &mut Vec<ChatMessage>,
        workspace: &Path,
        logs: &mut Vec<String>,
    ) -> Result<String, OllamaError> {
        let tools = self.registry.specs();

        for iteration in 1..=self.max_iterations {
            let response = self.chat.chat(messages, &self.model, Some(&tools)).await?;
            messages.push(response.message.clone());

            // Native tool_calls first; fall back to JSON-in-text parsing.
            let tool_calls = response
                .message
                .tool_calls
                .clone()
                .filter(|calls| !calls.is_empty())
                .unwrap_or_else(|| parse_tool_calls_from_text(&response.message.content));

            if tool_calls.is_empty() {
                info!(iteration, "agent task completed");
                return Ok(response.message.content);
            }

            for call in &tool_calls {
                logs.push(format!("Invoking tool: {}", call.function.name));
                let output = self.registry.dispatch(call, workspace).await;
                debug!(
                    tool = %call.function.name,
                    output_len = output.len(),
                    "tool call finished"
                );
                messages.push(ChatMessage::tool(output));
            }
        }

        // Iteration budget exhausted — one final call without tools so the
        // model can still produce an answer from what it has seen.
        warn!(
            max_iterations = self.max_iterations,
            "iteration budget exhausted — requesting final answer"
        );
        logs.push("Reached maximum iterations — requesting final answer".to_string());
        messages.push(ChatMessage::user(
            "Stop using tools now and give your final answer for the task.",
        ));
        let response = self.chat.chat(messages, &self.model, None).await?;
        Ok(response.message.content)
    }

    /// Build the "Relevant previous context:" block from memory.
    pub async fn memory_context(&self, query: &str) -> String {
        self.metrics.inc_memory_searches();
        let matches = self.memory.search(query, self.context_snippets).await;
        if matches.is_empty() {
            return String::new();
        }

        let mut context = String::from("Relevant previous context:\n");
        for m in &matches {
            context.push_str("- ");
            context.push_str(&m.record.content);
            context.push('\n');
        }
        context
    }

    /// Pick the workspace directory for this run.
    ///
    /// A requested path that is not a directory logs a warning (into the
    /// task's log array, like every other progress line) and falls back to
    /// the configured root.
    fn select_workspace(&self, requested: Option<&str>, logs: &mut Vec<String>) -> PathBuf {
        match requested {
            Some(path) if !path.is_empty() => {
                let candidate = PathBuf::from(path);
                if candidate.is_dir() {
                    logs.push(format!("Using workspace: {path}"));
                    candidate
                } else {
                    logs.push(format!(
                        "Warning: workspace '{path}' is not a directory — using {}",
                        self.workspace_root.display()
                    ));
                    self.workspace_root.clone()
                }
            }
            _ => {
                logs.push(format!("Using workspace: {}", self.workspace_root.display()));
                self.workspace_root.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;
    use crate::memory::embedder::MockEmbedder;
    use crate::metrics::AgentMetrics;
    use crate::policy::CommandPolicy;
    use crate::storage::Storage;

    /// Agent wired to an unreachable Ollama port.
    async fn offline_agent(dir: &tempfile::TempDir) -> (CodingAgent, Arc<MemoryStore>) {
        let mut config =
            DaemonConfig::new(None, Some(dir.path().to_path_buf()), None, None, None);
        config.ollama.base_url = "http://127.0.0.1:1".to_string();
        config.workspace_root = dir.path().join("workspace");
        std::fs::create_dir_all(&config.workspace_root).unwrap();

        let storage = Storage::new(dir.path()).await.unwrap();
        let memory = Arc::new(MemoryStore::new(
            storage.pool(),
            Arc::new(MockEmbedder::default()),
        ));
        memory.migrate().await.unwrap();

        let metrics: SharedMetrics = Arc::new(AgentMetrics::new());
        let chat = ChatClient::new(config.ollama.base_url.clone(), config.ollama.temperature);
        let registry = ToolRegistry::new(
            &config.agent,
            CommandPolicy::default_rules(),
            metrics.clone(),
        );
        let agent = CodingAgent::new(&config, chat, registry, memory.clone(), metrics);
        (agent, memory)
    }

    #[tokio::test]
    async fn unreachable_backend_is_stringified_into_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let (agent, memory) = offline_agent(&dir).await;

        let outcome = agent.run_task("add a hello world script", None).await;
        assert!(outcome.result.starts_with("Error during task execution:"));
        assert!(outcome
            .logs
            .iter()
            .any(|l| l == "Starting agent execution..."));

        // The task itself was still recorded in memory.
        let recent = memory.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].content.starts_with("Task: "));
        assert_eq!(recent[0].metadata["type"], "task");
    }

    #[tokio::test]
    async fn bad_workspace_falls_back_to_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let (agent, _memory) = offline_agent(&dir).await;

        let outcome = agent
            .run_task("anything", Some("/definitely/not/a/dir"))
            .await;
        assert!(outcome
            .logs
            .iter()
            .any(|l| l.starts_with("Warning: workspace")));
    }

    #[tokio::test]
    async fn memory_context_lists_matches() {
        let dir = tempfile::TempDir::new().unwrap();
        let (agent, memory) = offline_agent(&dir).await;

        memory
            .add("fixed the fibonacci bug", serde_json::json!({}))
            .await
            .unwrap();

        let context = agent.memory_context("fixed the fibonacci bug").await;
        assert!(context.starts_with("Relevant previous context:\n"));
        assert!(context.contains("- fixed the fibonacci bug"));

        memory.clear().await.unwrap();
        assert!(agent.memory_context("anything").await.is_empty());
    }
}
