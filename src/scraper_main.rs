use std::sync::Arc;

use anyhow::Context;

use newsrag_backend::core::config::{AppPaths, ConfigService};
use newsrag_backend::core::logging;
use newsrag_backend::scraping::{articles_path, save_articles, HttpPageSource, Scraper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "scraper.log");

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;
    let output = articles_path(&settings.scraper, &paths);

    let source = HttpPageSource::new(&settings.scraper).context("Failed to build HTTP client")?;
    let scraper = Scraper::new(source, settings.scraper.clone());
    let articles = scraper.run().await;

    save_articles(&output, &articles)?;
    tracing::info!(
        collected = articles.len(),
        "Saved {} articles to {}",
        articles.len(),
        output.display()
    );

    Ok(())
}
