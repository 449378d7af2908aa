pub mod agent;
pub mod config;
pub mod doctor;
pub mod memory;
pub mod metrics;
pub mod ollama;
pub mod policy;
pub mod rest;
pub mod storage;
pub mod tools;
pub mod workspace;

use std::sync::Arc;

use agent::CodingAgent;
use config::DaemonConfig;
use memory::store::MemoryStore;
use metrics::SharedMetrics;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    /// The task-execution agent. Serializes runs internally — one task at a time.
    pub agent: Arc<CodingAgent>,
    /// Vector memory store (SQLite rows + Ollama embeddings).
    pub memory: Arc<MemoryStore>,
    /// In-process Prometheus-style metrics counters.
    pub metrics: SharedMetrics,
    pub started_at: std::time::Instant,
}
