use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 8000;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── OllamaConfig ─────────────────────────────────────────────────────────────

/// Model backend configuration (`[ollama]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Chat model driving the agent loop.
    pub model: String,
    /// Embedding model backing the vector memory.
    pub embed_model: String,
    /// Sampling temperature for chat requests.
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            temperature: 0.1,
        }
    }
}

// ─── AgentConfig ──────────────────────────────────────────────────────────────

/// Agent loop configuration (`[agent]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum chat iterations per task before the loop is cut short.
    pub max_iterations: usize,
    /// Timeout for a single tool subprocess (code execution, shell), seconds.
    pub tool_timeout_secs: u64,
    /// Maximum conversation-history messages carried across tasks.
    pub history_limit: usize,
    /// Interpreter binary for the code execution tool.
    pub python_bin: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout_secs: 30,
            history_limit: 40,
            python_bin: "python3".to_string(),
        }
    }
}

// ─── PolicyConfig ─────────────────────────────────────────────────────────────

/// Command filter configuration (`[policy]` in config.toml).
///
/// `denied_commands` extends the built-in denylist; it cannot remove the
/// built-in entries.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    pub denied_commands: Vec<String>,
}

// ─── MemoryConfig ─────────────────────────────────────────────────────────────

/// Vector memory configuration (`[memory]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Default number of results for a similarity search.
    pub search_results: usize,
    /// How many memory snippets are injected into the agent's context.
    pub context_snippets: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            search_results: 5,
            context_snippets: 3,
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP API port (default: 8000).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Default workspace directory for tasks that do not name one.
    workspace_root: Option<PathBuf>,
    /// Log level filter string, e.g. "debug", "info,forged=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Model backend (`[ollama]`).
    ollama: Option<OllamaConfig>,
    /// Agent loop tuning (`[agent]`).
    agent: Option<AgentConfig>,
    /// Command filter extensions (`[policy]`).
    policy: Option<PolicyConfig>,
    /// Vector memory tuning (`[memory]`).
    memory: Option<MemoryConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    /// Bind address for the HTTP server (FORGED_BIND env var).
    pub bind_address: String,
    pub data_dir: PathBuf,
    /// Default workspace for tasks that do not pass `workspace_path`.
    pub workspace_root: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    pub ollama: OllamaConfig,
    pub agent: AgentConfig,
    pub policy: PolicyConfig,
    pub memory: MemoryConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        workspace_root: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("FORGED_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let workspace_root = workspace_root
            .or(toml.workspace_root)
            .unwrap_or_else(|| PathBuf::from("workspace"));

        let log_format = std::env::var("FORGED_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let mut ollama = toml.ollama.unwrap_or_default();
        if let Ok(url) = std::env::var("FORGED_OLLAMA_URL") {
            if !url.is_empty() {
                ollama.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("FORGED_MODEL") {
            if !model.is_empty() {
                ollama.model = model;
            }
        }

        Self {
            port,
            bind_address,
            data_dir,
            workspace_root,
            log,
            log_format,
            ollama,
            agent: toml.agent.unwrap_or_default(),
            policy: toml.policy.unwrap_or_default(),
            memory: toml.memory.unwrap_or_default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/forged
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("forged");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/forged or ~/.local/share/forged
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("forged");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("forged");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\forged
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("forged");
        }
    }
    // Fallback
    PathBuf::from(".forged")
}
