use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingProvider, OpenAiEmbeddingProvider};
use crate::history::HistoryStore;
use crate::llm::build_provider;
use crate::rag::{build_index, AnswerService, Retriever};

pub mod error;

use error::InitializationError;

/// Service handles shared by every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub answer: AnswerService,
}

impl AppState {
    pub fn new(answer: AnswerService) -> Arc<Self> {
        Arc::new(Self { answer })
    }

    /// Checks required credentials, then connects the history store, the
    /// vector index, the embedding client and the LLM client.
    pub async fn initialize(
        paths: &AppPaths,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        settings
            .require_llm_credentials()
            .and_then(|_| settings.require_index_endpoint())
            .map_err(|e| InitializationError::Config(e.into()))?;

        let history = HistoryStore::new(paths.history_db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            OpenAiEmbeddingProvider::new(&settings.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        let index = build_index(&settings.index, paths)
            .await
            .map_err(|e| InitializationError::Index(e.into()))?;
        // A fresh deployment answers "no articles" instead of failing on a
        // missing collection. A dimension mismatch is a configuration error.
        index
            .check_collection(embedder.dimension())
            .await
            .map_err(|e| match e {
                ApiError::BadRequest(_) => InitializationError::Config(e.into()),
                other => InitializationError::Index(other.into()),
            })?;

        let llm = build_provider(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;

        let retriever = Retriever::new(embedder, index, settings.retrieval.clone());
        let answer = AnswerService::new(
            retriever,
            llm,
            history,
            settings.history.session_key.clone(),
        );

        Ok(Self::new(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{ArticlePayload, IndexedRecord, SqliteVectorIndex, VectorIndex};

    fn temp_paths() -> AppPaths {
        let root = std::env::temp_dir().join(format!("newsrag-state-{}", uuid::Uuid::new_v4()));
        AppPaths::with_dirs(root.clone(), root.join("data"))
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("test-key".to_string());
        settings
    }

    async fn seed_index(paths: &AppPaths, dimension: usize, records: u64) -> SqliteVectorIndex {
        let index = SqliteVectorIndex::open(&paths.index_db_path, &settings().index.collection)
            .await
            .unwrap();
        index.ensure_collection(dimension).await.unwrap();
        let mut vector = vec![0.0; dimension];
        vector[0] = 1.0;
        index
            .upsert(
                (0..records)
                    .map(|id| IndexedRecord {
                        id,
                        vector: vector.clone(),
                        payload: ArticlePayload::default(),
                    })
                    .collect(),
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn dimension_mismatch_is_fatal_and_keeps_the_index() {
        let paths = temp_paths();
        let index = seed_index(&paths, 2, 3).await;

        let result = AppState::initialize(&paths, settings()).await;
        assert!(matches!(result, Err(InitializationError::Config(_))));
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn matching_dimension_starts_with_existing_records() {
        let paths = temp_paths();
        let dimension = settings().embedding.dimension;
        let index = seed_index(&paths, dimension, 2).await;

        let state = AppState::initialize(&paths, settings()).await.unwrap();
        assert_eq!(state.answer.index_name(), "sqlite");
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_llm_key_is_a_config_error() {
        let paths = temp_paths();
        let result = AppState::initialize(&paths, Settings::default()).await;
        assert!(matches!(result, Err(InitializationError::Config(_))));
    }
}
