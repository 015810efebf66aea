//! Retrieval side of the chatbot.
//!
//! - `VectorIndex`: nearest-neighbour contract with SQLite and Qdrant backends
//! - `Indexer`: full re-index of the articles document
//! - `AnswerService`: retrieve, prompt, generate, record history

mod answer;
mod indexer;
mod prompt;
mod qdrant;
mod sqlite;
mod store;

pub use answer::{
    AnswerService, AskResponse, Retriever, EMPTY_QUERY_ANSWER, NO_ANSWER_GENERATED,
    NO_RESULTS_ANSWER,
};
pub use indexer::{IndexReport, Indexer};
pub use prompt::{build_prompt, clean_url, format_answer, make_snippet, QueryHit, Source};
pub use qdrant::QdrantVectorIndex;
pub use sqlite::SqliteVectorIndex;
pub use store::{ArticlePayload, IndexedRecord, PointId, ScoredRecord, VectorIndex};

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{AppPaths, IndexBackend, IndexSettings};
use crate::core::errors::ApiError;

/// Opens the backend selected in `index.backend`.
pub async fn build_index(
    settings: &IndexSettings,
    paths: &AppPaths,
) -> Result<Arc<dyn VectorIndex>, ApiError> {
    let index: Arc<dyn VectorIndex> = match settings.backend {
        IndexBackend::Sqlite => {
            Arc::new(SqliteVectorIndex::open(&paths.index_db_path, &settings.collection).await?)
        }
        IndexBackend::Qdrant => {
            let url = settings
                .qdrant_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("index.qdrant_url is not set".to_string()))?;
            Arc::new(QdrantVectorIndex::new(
                url,
                settings.qdrant_api_key.clone(),
                &settings.collection,
                Duration::from_secs(settings.request_timeout_secs),
            )?)
        }
    };
    tracing::info!(
        backend = index.name(),
        collection = %settings.collection,
        "Vector index ready"
    );
    Ok(index)
}
