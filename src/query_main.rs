use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use newsrag_backend::core::config::{AppPaths, ConfigService, RetrievalSettings};
use newsrag_backend::core::logging;
use newsrag_backend::embedding::{EmbeddingProvider, OpenAiEmbeddingProvider};
use newsrag_backend::rag::{build_index, QueryHit, Retriever};

const CONSOLE_SNIPPET_CHARS: usize = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "query.log");

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;
    settings.require_index_endpoint()?;

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        OpenAiEmbeddingProvider::new(&settings.embedding)
            .context("Failed to build embedding client")?,
    );
    let index = build_index(&settings.index, &paths)
        .await
        .context("Failed to open vector index")?;
    index
        .check_collection(embedder.dimension())
        .await
        .context("Vector index does not match the embedding model")?;
    let retriever = Retriever::new(
        embedder,
        index,
        RetrievalSettings {
            snippet_chars: CONSOLE_SNIPPET_CHARS,
            ..settings.retrieval.clone()
        },
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nAsk me about the news (or type 'exit'): ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let question = line?;
        let question = question.trim();
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match retriever.retrieve(question).await {
            Ok(hits) => print_hits(question, &hits),
            Err(e) => tracing::error!("Query failed: {}", e),
        }
    }

    Ok(())
}

fn print_hits(question: &str, hits: &[QueryHit]) {
    println!("\nQuery: {}", question);
    println!("Top Results:");
    for (i, hit) in hits.iter().enumerate() {
        println!("\n {}. {}", i + 1, hit.title);
        println!("    {}", hit.url);
        println!("    {}...", hit.snippet);
    }
}
