//! SQLite-backed vector memory store.
//!
//! Each row holds the snippet text, a metadata JSON object, and the
//! embedding vector as little-endian f32 bytes. Similarity search embeds the
//! query and ranks every stored vector by cosine score in-process.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use super::embedder::Embedder;
use super::{MemoryMatch, MemoryRecord, MemoryStats};

#[derive(Debug, Clone, sqlx::FromRow)]
struct MemoryRow {
    id: String,
    content: String,
    metadata: String,
    embedding: Vec<u8>,
    created_at: String,
}

impl MemoryRow {
    fn into_record(self) -> MemoryRecord {
        let metadata = serde_json::from_str(&self.metadata)
            .unwrap_or(serde_json::Value::Object(Default::default()));
        MemoryRecord {
            id: self.id,
            content: self.content,
            metadata,
            created_at: self.created_at,
        }
    }
}

pub struct MemoryStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl MemoryStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }

    /// Create the memory table (idempotent).
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_records (
                id         TEXT PRIMARY KEY,
                content    TEXT NOT NULL,
                metadata   TEXT NOT NULL DEFAULT '{}',
                embedding  BLOB NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memory_created ON memory_records(created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Creating memory_records table")?;
        Ok(())
    }

    /// Store a snippet, returning its ID.
    ///
    /// `timestamp` and `content_length` are stamped into the metadata object.
    pub async fn add(&self, content: &str, metadata: serde_json::Value) -> Result<String> {
        let id = format!("mem-{}", Uuid::new_v4());
        let now = chrono::Utc::now().to_rfc3339();

        let mut metadata = match metadata {
            serde_json::Value::Object(map) => map,
            _ => Default::default(),
        };
        metadata.insert("timestamp".to_string(), serde_json::json!(now));
        metadata.insert(
            "content_length".to_string(),
            serde_json::json!(content.len()),
        );

        let embedding = self
            .embedder
            .embed(content)
            .await
            .context("Embedding memory content")?;

        sqlx::query(
            r#"
            INSERT INTO memory_records (id, content, metadata, embedding, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(content)
        .bind(serde_json::Value::Object(metadata).to_string())
        .bind(encode_embedding(&embedding))
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Inserting memory record")?;

        Ok(id)
    }

    /// Similarity search: top `n` records ranked by cosine score.
    ///
    /// Failures (embedding backend down, database error) are logged and come
    /// back as an empty list — memory search never takes a task down with it.
    pub async fn search(&self, query: &str, n: usize) -> Vec<MemoryMatch> {
        let query_embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(err = %e, "memory search embedding failed");
                return Vec::new();
            }
        };

        let rows: Vec<MemoryRow> = match sqlx::query_as(
            "SELECT id, content, metadata, embedding, created_at FROM memory_records",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(err = %e, "memory search query failed");
                return Vec::new();
            }
        };

        let mut matches: Vec<MemoryMatch> = rows
            .into_iter()
            .map(|row| {
                let stored = decode_embedding(&row.embedding);
                let score = cosine_similarity(&query_embedding, &stored);
                MemoryMatch {
                    record: row.into_record(),
                    score,
                }
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(n);
        matches
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<MemoryRecord>> {
        let rows: Vec<MemoryRow> = sqlx::query_as(
            r#"
            SELECT id, content, metadata, embedding, created_at
            FROM memory_records
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Fetching recent memory records")?;

        Ok(rows.into_iter().map(MemoryRow::into_record).collect())
    }

    /// Remove every stored record.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM memory_records")
            .execute(&self.pool)
            .await
            .context("Clearing memory records")?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memory_records")
            .fetch_one(&self.pool)
            .await
            .context("Counting memory records")?;

        let (last_updated,): (Option<String>,) =
            sqlx::query_as("SELECT MAX(created_at) FROM memory_records")
                .fetch_one(&self.pool)
                .await
                .context("Fetching last memory timestamp")?;

        Ok(MemoryStats {
            total,
            last_updated,
        })
    }
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in [-1, 1]. Zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
