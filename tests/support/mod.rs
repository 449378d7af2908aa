//! Shared test wiring: a minimal AppContext on a random port.
//!
//! The Ollama base URL points at a closed port so chat/embedding calls fail
//! fast; the memory store uses the deterministic offline embedder.

use std::sync::Arc;

use tempfile::TempDir;

use forged::{
    agent::CodingAgent,
    config::DaemonConfig,
    memory::embedder::MockEmbedder,
    memory::store::MemoryStore,
    metrics::AgentMetrics,
    ollama::ChatClient,
    policy::CommandPolicy,
    storage::Storage,
    tools::ToolRegistry,
    AppContext,
};

/// Find a free local port by binding to port 0.
pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Build a minimal AppContext on the given port for testing.
pub async fn make_test_ctx(dir: &TempDir, port: u16) -> Arc<AppContext> {
    let mut config = DaemonConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some(dir.path().join("workspace")),
        Some("error".to_string()),
        None,
    );
    // Closed port — model calls fail immediately instead of hanging.
    config.ollama.base_url = "http://127.0.0.1:1".to_string();
    std::fs::create_dir_all(&config.workspace_root).unwrap();
    let config = Arc::new(config);

    let storage = Storage::new(dir.path()).await.unwrap();
    let metrics = Arc::new(AgentMetrics::new());

    let memory = Arc::new(MemoryStore::new(
        storage.pool(),
        Arc::new(MockEmbedder::default()),
    ));
    memory.migrate().await.unwrap();

    let chat = ChatClient::new(config.ollama.base_url.clone(), config.ollama.temperature);
    let registry = ToolRegistry::new(
        &config.agent,
        CommandPolicy::with_extensions(&config.policy.denied_commands),
        metrics.clone(),
    );
    let agent = Arc::new(CodingAgent::new(
        &config,
        chat,
        registry,
        memory.clone(),
        metrics.clone(),
    ));

    Arc::new(AppContext {
        config,
        agent,
        memory,
        metrics,
        started_at: std::time::Instant::now(),
    })
}

/// Spawn the REST server for `ctx` and wait until it accepts connections.
pub async fn spawn_server(ctx: Arc<AppContext>) {
    tokio::spawn(async move {
        let _ = forged::rest::start_rest_server(ctx).await;
    });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
