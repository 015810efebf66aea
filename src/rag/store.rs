//! `VectorIndex`: the nearest-neighbour contract shared by every backend.
//!
//! Both the local SQLite index and the hosted Qdrant collection implement the
//! same contract so the indexer and the answer service never branch on the
//! backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Payload stored next to each vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Article body, already truncated at indexing time.
    #[serde(default)]
    pub text: Option<String>,
}

/// Point identifier. The indexer writes numbers; a hosted collection filled
/// by another tool may also hold UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl From<u64> for PointId {
    fn from(id: u64) -> Self {
        PointId::Num(id)
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(id) => write!(f, "{}", id),
            PointId::Uuid(id) => f.write_str(id),
        }
    }
}

/// A record as written by the indexer.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    /// Sequential, reassigned on every full re-index.
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ArticlePayload,
}

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub id: PointId,
    pub payload: ArticlePayload,
    /// Cosine similarity (higher = better). `None` if the backend omits it.
    pub score: Option<f32>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name used in logs and `/health`.
    fn name(&self) -> &str;

    /// Create the collection if missing. An existing collection with another
    /// dimension is emptied (or recreated) so vectors written afterwards must
    /// have `dimension` entries. Only a full re-index should call this.
    async fn ensure_collection(&self, dimension: usize) -> Result<(), ApiError>;

    /// Create the collection if missing, otherwise confirm it holds vectors of
    /// `dimension` entries. Never removes records: a mismatch is `BadRequest`.
    async fn check_collection(&self, dimension: usize) -> Result<(), ApiError>;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<(), ApiError>;

    /// Top `limit` records by descending cosine similarity.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>, ApiError>;

    /// Delete records by id, returning how many existed.
    async fn delete(&self, ids: &[PointId]) -> Result<usize, ApiError>;

    /// Every id currently stored in the collection.
    async fn list_ids(&self) -> Result<Vec<PointId>, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;
}
