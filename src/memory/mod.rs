//! Vector memory — text snippets with metadata, searched by similarity.
//!
//! Records persist in SQLite with their embedding vectors; embeddings come
//! from the Ollama embeddings endpoint and ranking is in-process cosine.

pub mod embedder;
pub mod store;

use serde::{Deserialize, Serialize};

/// A stored memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    /// Free-form JSON object; `timestamp` and `content_length` are stamped on add.
    pub metadata: serde_json::Value,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// A search hit with its similarity score (higher = closer).
#[derive(Debug, Clone, Serialize)]
pub struct MemoryMatch {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub total: i64,
    pub last_updated: Option<String>,
}
