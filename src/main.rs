use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use forged::{
    agent::CodingAgent,
    config::DaemonConfig,
    doctor,
    memory::embedder::OllamaEmbedder,
    memory::store::MemoryStore,
    metrics::AgentMetrics,
    ollama::ChatClient,
    policy::CommandPolicy,
    rest, storage::Storage,
    tools::ToolRegistry,
    AppContext,
};

#[derive(Parser)]
#[command(
    name = "forged",
    about = "Forged — local coding agent daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP API port
    #[arg(long, env = "FORGED_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "FORGED_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Default workspace directory for tasks
    #[arg(long, env = "FORGED_WORKSPACE")]
    workspace: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FORGED_LOG")]
    log: Option<String>,

    /// Bind address for the HTTP server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "FORGED_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "FORGED_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    ///
    /// Examples:
    ///   forged serve
    ///   forged
    Serve,
    /// Diagnose the daemon's prerequisites without starting it.
    ///
    /// Probes the API port, the Ollama server, the Python interpreter,
    /// and the workspace/data directories. Exits non-zero when anything
    /// is broken.
    ///
    /// Examples:
    ///   forged doctor
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format = std::env::var("FORGED_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    match args.command {
        Some(Command::Doctor) => {
            let config = DaemonConfig::new(
                args.port,
                args.data_dir,
                args.workspace,
                Some("error".to_string()),
                args.bind_address,
            );
            let report = doctor::run(&config).await;
            print!("{report}");
            std::process::exit(if report.all_passed() { 0 } else { 1 });
        }
        None | Some(Command::Serve) => {
            run_server(
                args.port,
                args.data_dir,
                args.workspace,
                args.log,
                args.bind_address,
            )
            .await?;
        }
    }

    Ok(())
}

async fn run_server(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    workspace: Option<std::path::PathBuf>,
    log: Option<String>,
    bind_address: Option<String>,
) -> Result<()> {
    let config = Arc::new(DaemonConfig::new(
        port,
        data_dir,
        workspace,
        log,
        bind_address,
    ));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        workspace = %config.workspace_root.display(),
        model = %config.ollama.model,
        "starting forged"
    );

    tokio::fs::create_dir_all(&config.workspace_root).await?;

    let storage = Storage::new(&config.data_dir).await?;
    let metrics = Arc::new(AgentMetrics::new());

    let chat = ChatClient::new(config.ollama.base_url.clone(), config.ollama.temperature);
    let embedder = Arc::new(OllamaEmbedder::new(chat.clone(), &config.ollama.embed_model));

    let memory = Arc::new(MemoryStore::new(storage.pool(), embedder));
    memory.migrate().await?;

    let policy = CommandPolicy::load_from_json(
        CommandPolicy::with_extensions(&config.policy.denied_commands),
        &config.data_dir.join("policies").join("denied-commands.json"),
    );
    let registry = ToolRegistry::new(&config.agent, policy, metrics.clone());
    info!(tools = ?registry.names(), "tool registry ready");

    let agent = Arc::new(CodingAgent::new(
        &config,
        chat,
        registry,
        memory.clone(),
        metrics.clone(),
    ));

    let ctx = Arc::new(AppContext {
        config,
        agent,
        memory,
        metrics,
        started_at: std::time::Instant::now(),
    });

    rest::start_rest_server(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("forged.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(log_level)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(log_level)
                    .compact()
                    .init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
        None
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
        None
    }
}
