//! Retrieve-then-generate pipeline behind `/ask`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::prompt::{build_prompt, collect_sources, format_answer, make_snippet, QueryHit, Source};
use super::store::VectorIndex;
use crate::core::config::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::history::HistoryStore;
use crate::llm::LlmProvider;

pub const EMPTY_QUERY_ANSWER: &str = "Please provide a query.";
pub const NO_RESULTS_ANSWER: &str =
    "Sorry, I couldn't find relevant news articles in the database.";
pub const NO_ANSWER_GENERATED: &str = "No answer generated.";

const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskResponse {
    pub history: Vec<String>,
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Embeds a question and looks up its nearest articles.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    pub fn top_k(&self) -> usize {
        self.settings.top_k
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Top-k articles for `question`, most similar first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<QueryHit>, ApiError> {
        let vector = self.embedder.embed_one(question).await?;
        let records = self.index.search(&vector, self.settings.top_k).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let payload = record.payload;
                QueryHit {
                    title: payload.title.unwrap_or_else(|| UNTITLED.to_string()),
                    url: payload.url.unwrap_or_default(),
                    snippet: make_snippet(
                        payload.text.as_deref().unwrap_or_default(),
                        self.settings.snippet_chars,
                    ),
                    score: record.score,
                }
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct AnswerService {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    history: HistoryStore,
    session_key: String,
}

impl AnswerService {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmProvider>,
        history: HistoryStore,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            llm,
            history,
            session_key: session_key.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        self.retriever.index_name()
    }

    pub fn llm_name(&self) -> &str {
        self.llm.name()
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<QueryHit>, ApiError> {
        self.retriever.retrieve(question).await
    }

    pub async fn ask(&self, query: &str) -> Result<AskResponse, ApiError> {
        let question = query.trim();
        if question.is_empty() {
            return Ok(AskResponse {
                history: Vec::new(),
                answer: EMPTY_QUERY_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let hits = self.retrieve(question).await?;
        if hits.is_empty() {
            info!("No articles matched the question");
            let history = self.record_exchange(question, NO_RESULTS_ANSWER).await?;
            return Ok(AskResponse {
                history,
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(question, &hits, self.retriever.top_k());
        debug!(hits = hits.len(), llm = self.llm.name(), "Generating answer");
        let generated = self.llm.generate(&prompt).await?;
        let summary = if generated.trim().is_empty() {
            NO_ANSWER_GENERATED.to_string()
        } else {
            generated
        };

        let sources = collect_sources(&hits);
        let answer = format_answer(&summary, &sources);
        let history = self.record_exchange(question, &answer).await?;

        Ok(AskResponse {
            history,
            answer,
            sources,
        })
    }

    pub async fn clear(&self) -> Result<(), ApiError> {
        let removed = self.history.clear(&self.session_key).await?;
        info!(removed, "Chat history cleared");
        Ok(())
    }

    pub async fn history(&self) -> Result<Vec<String>, ApiError> {
        self.history.read_all(&self.session_key).await
    }

    async fn record_exchange(&self, question: &str, answer: &str) -> Result<Vec<String>, ApiError> {
        self.history
            .append(&self.session_key, &format!("You: {}", question))
            .await?;
        self.history
            .append(&self.session_key, &format!("Bot: {}", answer))
            .await?;
        self.history.read_all(&self.session_key).await
    }
}
