use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use newsrag_backend::core::config::{AppPaths, IndexSettings, RetrievalSettings};
use newsrag_backend::core::errors::ApiError;
use newsrag_backend::embedding::EmbeddingProvider;
use newsrag_backend::history::HistoryStore;
use newsrag_backend::llm::LlmProvider;
use newsrag_backend::rag::{
    AnswerService, Indexer, Retriever, SqliteVectorIndex, VectorIndex, EMPTY_QUERY_ANSWER,
    NO_RESULTS_ANSWER,
};
use newsrag_backend::scraping::Article;
use newsrag_backend::server::router::router;
use newsrag_backend::state::AppState;

/// Bag-of-keywords vectors: one axis per topic word plus a bias axis.
struct KeywordEmbedder;

const TOPICS: [&str; 4] = ["election", "budget", "monsoon", "football"];

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn dimension(&self) -> usize {
        TOPICS.len() + 1
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v: Vec<f32> = TOPICS
                    .iter()
                    .map(|t| lower.matches(t).count() as f32)
                    .collect();
                v.push(0.01);
                v
            })
            .collect())
    }
}

enum LlmBehaviour {
    Reply(&'static str),
    Fail,
}

struct FakeLlm(LlmBehaviour);

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
        match self.0 {
            LlmBehaviour::Reply(text) => Ok(text.to_string()),
            LlmBehaviour::Fail => Err(ApiError::Internal("connection refused".to_string())),
        }
    }
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("newsrag-api-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn articles() -> Vec<Article> {
    vec![
        Article {
            title: "Election results announced".to_string(),
            url: "https://news.example/election".to_string(),
            content: "The election commission announced results. ".repeat(10),
            source: None,
        },
        Article {
            title: "Budget passes parliament".to_string(),
            url: "* https://news.example/budget".to_string(),
            content: "The budget allocates more to health. Budget debate ended.".to_string(),
            source: Some("wire".to_string()),
        },
        Article {
            title: "Monsoon arrives early".to_string(),
            url: String::new(),
            content: "Monsoon rains reached the coast.\nMonsoon forecasts were revised."
                .to_string(),
            source: None,
        },
    ]
}

struct Harness {
    app: Router,
    index: Arc<SqliteVectorIndex>,
}

async fn harness(llm: LlmBehaviour, seed: bool) -> Harness {
    let root = temp_dir();
    let paths = AppPaths::with_dirs(root.clone(), root.join("data"));

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(KeywordEmbedder);
    let index = Arc::new(
        SqliteVectorIndex::open(&paths.index_db_path, "news_articles")
            .await
            .unwrap(),
    );
    index.check_collection(embedder.dimension()).await.unwrap();
    if seed {
        Indexer::new(embedder.clone(), index.clone(), &IndexSettings::default())
            .run(&articles())
            .await
            .unwrap();
    }

    let history = HistoryStore::new(paths.history_db_path.clone()).await.unwrap();
    let retriever = Retriever::new(embedder, index.clone(), RetrievalSettings::default());
    let answer = AnswerService::new(retriever, Arc::new(FakeLlm(llm)), history, "chat_history");
    let state = AppState::new(answer);

    Harness {
        app: router(state),
        index,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn ask(app: &Router, query: &str) -> Value {
    let (status, body) = send(app, Method::POST, "/ask", Some(json!({ "query": query }))).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn history(app: &Router) -> Vec<String> {
    let (status, body) = send(app, Method::GET, "/history", None).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body["history"].clone()).unwrap()
}

#[tokio::test]
async fn blank_query_leaves_history_untouched() {
    let h = harness(LlmBehaviour::Reply("unused"), true).await;
    ask(&h.app, "election").await;
    let before = history(&h.app).await;

    for query in ["", "   ", "\n\t"] {
        let body = ask(&h.app, query).await;
        assert_eq!(body["answer"], EMPTY_QUERY_ANSWER);
        assert_eq!(body["history"], json!([]));
        assert_eq!(body["sources"], json!([]));
    }

    assert_eq!(history(&h.app).await, before);
}

#[tokio::test]
async fn missing_or_null_query_is_blank() {
    let h = harness(LlmBehaviour::Reply("unused"), true).await;
    for payload in [json!({}), json!({ "query": null })] {
        let (status, body) = send(&h.app, Method::POST, "/ask", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], EMPTY_QUERY_ANSWER);
    }
    assert!(history(&h.app).await.is_empty());
}

#[tokio::test]
async fn empty_index_answers_with_apology_and_records_it() {
    let h = harness(LlmBehaviour::Reply("unused"), false).await;
    let body = ask(&h.app, "any election news?").await;

    assert_eq!(body["answer"], NO_RESULTS_ANSWER);
    assert_eq!(body["sources"], json!([]));
    let expected = vec![
        "You: any election news?".to_string(),
        format!("Bot: {}", NO_RESULTS_ANSWER),
    ];
    assert_eq!(body["history"], json!(expected));
    assert_eq!(history(&h.app).await, expected);
}

#[tokio::test]
async fn sources_skip_empty_urls_and_strip_padding() {
    let h = harness(LlmBehaviour::Reply("Summary of the news."), true).await;
    let body = ask(&h.app, "budget and monsoon").await;

    // All three articles come back; the monsoon one has no url.
    assert_eq!(
        body["sources"],
        json!([
            { "title": "Budget passes parliament", "url": "https://news.example/budget" },
            { "title": "Election results announced", "url": "https://news.example/election" },
        ])
    );

    let answer = body["answer"].as_str().unwrap();
    assert!(answer.starts_with("Summary of the news.\n\nSources:\n"));
    assert!(answer.contains("Budget passes parliament - https://news.example/budget"));
    assert!(!answer.contains("Monsoon arrives early -"));
}

#[tokio::test]
async fn history_alternates_in_call_order() {
    let h = harness(LlmBehaviour::Reply("Answer."), true).await;
    let questions = ["election", "budget", "monsoon"];
    for q in questions {
        ask(&h.app, q).await;
    }

    let entries = history(&h.app).await;
    assert_eq!(entries.len(), 2 * questions.len());
    for (i, q) in questions.iter().enumerate() {
        assert_eq!(entries[2 * i], format!("You: {}", q));
        assert!(entries[2 * i + 1].starts_with("Bot: Answer.\n\nSources:\n"));
    }
}

#[tokio::test]
async fn clear_session_empties_history() {
    let h = harness(LlmBehaviour::Reply("Answer."), true).await;
    ask(&h.app, "election").await;

    let (status, body) = send(&h.app, Method::POST, "/clear_session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Chat history cleared", "history": [] })
    );
    assert!(history(&h.app).await.is_empty());

    // Clearing an already empty session is fine.
    let (status, _) = send(&h.app, Method::POST, "/clear_session", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn llm_failure_is_a_generic_server_error() {
    let h = harness(LlmBehaviour::Fail, true).await;
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/ask",
        Some(json!({ "query": "election" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
    assert!(history(&h.app).await.is_empty());
}

#[tokio::test]
async fn reindexing_keeps_one_record_per_article() {
    let h = harness(LlmBehaviour::Reply("Answer."), true).await;
    let indexer = Indexer::new(
        Arc::new(KeywordEmbedder),
        h.index.clone(),
        &IndexSettings::default(),
    );
    indexer.run(&articles()).await.unwrap();
    indexer.run(&articles()).await.unwrap();

    assert_eq!(h.index.count().await.unwrap(), articles().len());
}

#[tokio::test]
async fn health_names_backends() {
    let h = harness(LlmBehaviour::Reply("Answer."), false).await;
    let (status, body) = send(&h.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "index": "sqlite", "llm": "fake" }));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let h = harness(LlmBehaviour::Reply("Answer."), false).await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/ask")
                .header(header::ORIGIN, "https://frontend.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
