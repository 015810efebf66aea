//! SQLite-backed vector index.
//!
//! In-process store using SQLite for payloads and brute-force cosine
//! similarity for search. Sized for a few thousand articles.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ArticlePayload, IndexedRecord, PointId, ScoredRecord, VectorIndex};
use crate::core::errors::ApiError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorIndex {
    pub async fn open(db_path: &Path, collection: &str) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self {
            pool,
            collection: collection.to_string(),
        };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_records (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                payload TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn collection_dimension(&self) -> Result<Option<usize>, ApiError> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM index_collections WHERE name = ?1")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(dimension.map(|d| d as usize))
    }

    async fn record_dimension(&self, dimension: usize) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO index_collections (name, dimension) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                dimension = excluded.dimension,
                updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(&self.collection)
        .bind(dimension as i64)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn require_dimension(&self, vector_len: usize) -> Result<(), ApiError> {
        let dimension = self.collection_dimension().await?.ok_or_else(|| {
            ApiError::NotFound(format!("collection '{}' does not exist", self.collection))
        })?;
        if dimension != vector_len {
            return Err(ApiError::BadRequest(format!(
                "Vector length mismatch: {} != {}",
                vector_len, dimension
            )));
        }
        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<(), ApiError> {
        match self.collection_dimension().await? {
            Some(existing) if existing == dimension => return Ok(()),
            Some(existing) => {
                tracing::warn!(
                    collection = %self.collection,
                    "Embedding dimension changed ({} -> {}); dropping stored vectors",
                    existing,
                    dimension
                );
                sqlx::query("DELETE FROM index_records WHERE collection = ?1")
                    .bind(&self.collection)
                    .execute(&self.pool)
                    .await
                    .map_err(ApiError::internal)?;
            }
            None => {}
        }

        self.record_dimension(dimension).await
    }

    async fn check_collection(&self, dimension: usize) -> Result<(), ApiError> {
        match self.collection_dimension().await? {
            Some(existing) if existing == dimension => Ok(()),
            Some(existing) => Err(ApiError::BadRequest(format!(
                "collection '{}' stores {}-dimensional vectors but embeddings have {}",
                self.collection, existing, dimension
            ))),
            None => self.record_dimension(dimension).await,
        }
    }

    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            self.require_dimension(record.vector.len()).await?;
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for record in &records {
            let payload = serde_json::to_string(&record.payload).map_err(ApiError::internal)?;
            sqlx::query(
                "INSERT OR REPLACE INTO index_records (collection, id, payload, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&self.collection)
            .bind(record.id as i64)
            .bind(&payload)
            .bind(Self::serialize_embedding(&record.vector))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.require_dimension(vector.len()).await?;

        let rows = sqlx::query(
            "SELECT id, payload, embedding FROM index_records WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let stored = Self::deserialize_embedding(&embedding_bytes);
            let payload_str: String = row.get("payload");
            let payload = serde_json::from_str::<ArticlePayload>(&payload_str).map_err(|e| {
                ApiError::Internal(format!(
                    "corrupt payload for record {} in '{}': {}",
                    id, self.collection, e
                ))
            })?;

            scored.push(ScoredRecord {
                id: PointId::Num(id as u64),
                payload,
                score: Some(cosine_similarity(vector, &stored)),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn delete(&self, ids: &[PointId]) -> Result<usize, ApiError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        let mut removed = 0usize;
        // Rows are keyed by integer, so UUID ids cannot match anything here.
        for id in ids.iter().filter_map(|id| match id {
            PointId::Num(n) => Some(*n),
            PointId::Uuid(_) => None,
        }) {
            let result = sqlx::query("DELETE FROM index_records WHERE collection = ?1 AND id = ?2")
                .bind(&self.collection)
                .bind(id as i64)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
            removed += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(ApiError::internal)?;

        Ok(removed)
    }

    async fn list_ids(&self) -> Result<Vec<PointId>, ApiError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM index_records WHERE collection = ?1 ORDER BY id")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(ids.into_iter().map(|id| PointId::Num(id as u64)).collect())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM index_records WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(count as usize)
    }
}
