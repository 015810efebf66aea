use std::sync::Arc;

use anyhow::Context;

use newsrag_backend::core::config::{AppPaths, ConfigService};
use newsrag_backend::core::logging;
use newsrag_backend::embedding::{EmbeddingProvider, OpenAiEmbeddingProvider};
use newsrag_backend::rag::{build_index, Indexer};
use newsrag_backend::scraping::{articles_path, load_articles};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "indexer.log");

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;
    settings.require_index_endpoint()?;

    let input = articles_path(&settings.scraper, &paths);
    let articles = load_articles(&input)?;
    tracing::info!("Loaded {} articles from {}", articles.len(), input.display());

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        OpenAiEmbeddingProvider::new(&settings.embedding)
            .context("Failed to build embedding client")?,
    );
    let index = build_index(&settings.index, &paths)
        .await
        .context("Failed to open vector index")?;

    let report = Indexer::new(embedder, index, &settings.index)
        .run(&articles)
        .await
        .context("Indexing failed")?;

    tracing::info!(
        deleted = report.deleted,
        indexed = report.indexed,
        "Index rebuilt in collection '{}'",
        settings.index.collection
    );

    Ok(())
}
