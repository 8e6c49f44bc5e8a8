use std::path::Path;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use crate::core::errors::IndexError;

/// A document chunk with its stored embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: i64,
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Handle to the prebuilt chunk index. The serving pipeline only reads;
/// `insert_chunk` exists for the ingestion job and tests.
#[derive(Clone)]
pub struct ChunkStore {
    pool: SqlitePool,
}

impl ChunkStore {
    pub async fn open(db_path: &Path) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), IndexError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL DEFAULT '',
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_chunk(
        &self,
        source: &str,
        text: &str,
        embedding: &[f32],
    ) -> Result<(), IndexError> {
        sqlx::query("INSERT INTO chunks (source, text, embedding) VALUES (?1, ?2, ?3)")
            .bind(source)
            .bind(text)
            .bind(serialize_embedding(embedding))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All chunks in insertion order. The index is small enough to rank in
    /// process, and insertion order is what breaks similarity ties.
    pub async fn all_chunks(&self) -> Result<Vec<Chunk>, IndexError> {
        let rows = sqlx::query("SELECT id, source, text, embedding FROM chunks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            chunks.push(Chunk {
                id: row.get("id"),
                source: row.get("source"),
                text: row.get("text"),
                embedding: deserialize_embedding(&blob),
            });
        }

        Ok(chunks)
    }

    pub async fn count_chunks(&self) -> Result<usize, IndexError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
