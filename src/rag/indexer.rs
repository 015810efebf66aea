use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::store::{ArticlePayload, IndexedRecord, VectorIndex};
use crate::core::config::IndexSettings;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::scraping::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub deleted: usize,
    pub indexed: usize,
}

/// Full re-index: the collection ends up holding exactly the given articles.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    title_chars: usize,
    payload_text_chars: usize,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: &IndexSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: settings.batch_size.max(1),
            title_chars: settings.title_chars,
            payload_text_chars: settings.payload_text_chars,
        }
    }

    pub async fn run(&self, articles: &[Article]) -> Result<IndexReport, ApiError> {
        self.index.ensure_collection(self.embedder.dimension()).await?;

        let existing = self.index.list_ids().await?;
        let deleted = self.index.delete(&existing).await?;
        if deleted > 0 {
            info!(index = self.index.name(), "Deleted {} existing records", deleted);
        }

        let mut indexed = 0usize;
        for (batch_no, batch) in articles.chunks(self.batch_size).enumerate() {
            let inputs: Vec<String> = batch.iter().map(embedding_input).collect();
            let vectors = self.embedder.embed(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::Internal(format!(
                    "embedding count mismatch: {} vectors for {} articles",
                    vectors.len(),
                    batch.len()
                )));
            }

            let records: Vec<IndexedRecord> = batch
                .iter()
                .zip(vectors)
                .enumerate()
                .map(|(offset, (article, vector))| IndexedRecord {
                    id: (indexed + offset) as u64,
                    vector,
                    payload: self.payload(article),
                })
                .collect();

            self.index.upsert(records).await?;
            indexed += batch.len();
            info!(batch = batch_no + 1, "Indexed {}/{} articles", indexed, articles.len());
        }

        Ok(IndexReport { deleted, indexed })
    }

    fn payload(&self, article: &Article) -> ArticlePayload {
        ArticlePayload {
            title: Some(truncate_chars(&article.title, self.title_chars)),
            url: Some(article.url.clone()),
            source: article.source.clone(),
            text: Some(truncate_chars(&article.content, self.payload_text_chars)),
        }
    }
}

fn embedding_input(article: &Article) -> String {
    format!("{} {}", article.title, article.content)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
