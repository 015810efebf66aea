use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::EmbeddingProvider;
use crate::core::config::EmbeddingSettings;
use crate::core::errors::ApiError;

/// Client for any server exposing the OpenAI `/v1/embeddings` route
/// (text-embeddings-inference, llama.cpp, LM Studio, Ollama).
#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            dimension: settings.dimension,
            client,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::transport)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: EmbeddingsResponse = res.json().await.map_err(ApiError::decode)?;
        collect_vectors(payload, inputs.len(), self.dimension)
    }
}

fn collect_vectors(
    payload: EmbeddingsResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, ApiError> {
    if payload.data.len() != expected {
        return Err(ApiError::Internal(format!(
            "embedding count mismatch: requested {}, received {}",
            expected,
            payload.data.len()
        )));
    }

    let mut items = payload.data;
    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index.unwrap_or_default());
    }

    let mut vectors = Vec::with_capacity(items.len());
    for item in items {
        if item.embedding.len() != dimension {
            return Err(ApiError::Internal(format!(
                "embedding dimension mismatch: expected {}, received {}",
                dimension,
                item.embedding.len()
            )));
        }
        vectors.push(item.embedding);
    }
    Ok(vectors)
}
