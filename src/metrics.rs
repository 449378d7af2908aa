//! Simple in-process counters exposed as `GET /metrics` in Prometheus text format.
//! No external library needed — all counters are `AtomicU64` incremented inline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-process performance counters shared across all requests.
#[derive(Debug)]
pub struct AgentMetrics {
    /// Total tasks executed since daemon start.
    pub tasks_executed: AtomicU64,
    /// Total tasks whose result was an error string since daemon start.
    pub tasks_failed: AtomicU64,
    /// Total tool calls dispatched since daemon start.
    pub tool_calls: AtomicU64,
    /// Total shell commands blocked by the command policy since daemon start.
    pub commands_blocked: AtomicU64,
    /// Total memory similarity searches since daemon start.
    pub memory_searches: AtomicU64,
    /// Daemon start time — used to calculate uptime in the metrics response.
    pub started_at: Instant,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            commands_blocked: AtomicU64::new(0),
            memory_searches: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn inc_tasks_executed(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tasks_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_commands_blocked(&self) {
        self.commands_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_memory_searches(&self) {
        self.memory_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Render counters in Prometheus text format.
    pub fn render_prometheus(&self) -> String {
        let uptime = self.started_at.elapsed().as_secs();
        let tasks_executed = self.tasks_executed.load(Ordering::Relaxed);
        let tasks_failed = self.tasks_failed.load(Ordering::Relaxed);
        let tool_calls = self.tool_calls.load(Ordering::Relaxed);
        let commands_blocked = self.commands_blocked.load(Ordering::Relaxed);
        let memory_searches = self.memory_searches.load(Ordering::Relaxed);

        format!(
            "# HELP forged_uptime_seconds Daemon uptime in seconds.\n\
             # TYPE forged_uptime_seconds gauge\n\
             forged_uptime_seconds {uptime}\n\
             # HELP forged_tasks_executed_total Total tasks executed since daemon start.\n\
             # TYPE forged_tasks_executed_total counter\n\
             forged_tasks_executed_total {tasks_executed}\n\
             # HELP forged_tasks_failed_total Total tasks that ended in an error result.\n\
             # TYPE forged_tasks_failed_total counter\n\
             forged_tasks_failed_total {tasks_failed}\n\
             # HELP forged_tool_calls_total Total tool calls dispatched since daemon start.\n\
             # TYPE forged_tool_calls_total counter\n\
             forged_tool_calls_total {tool_calls}\n\
             # HELP forged_commands_blocked_total Shell commands blocked by the command policy.\n\
             # TYPE forged_commands_blocked_total counter\n\
             forged_commands_blocked_total {commands_blocked}\n\
             # HELP forged_memory_searches_total Memory similarity searches since daemon start.\n\
             # TYPE forged_memory_searches_total counter\n\
             forged_memory_searches_total {memory_searches}\n"
        )
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle — cheaply clonable.
pub type SharedMetrics = Arc<AgentMetrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_and_render() {
        let metrics = AgentMetrics::new();
        metrics.inc_tasks_executed();
        metrics.inc_tool_calls();
        metrics.inc_tool_calls();

        let text = metrics.render_prometheus();
        assert!(text.contains("forged_tasks_executed_total 1"));
        assert!(text.contains("forged_tool_calls_total 2"));
        assert!(text.contains("forged_tasks_failed_total 0"));
    }
}
