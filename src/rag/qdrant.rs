//! Qdrant vector index over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::store::{ArticlePayload, IndexedRecord, PointId, ScoredRecord, VectorIndex};
use crate::core::errors::ApiError;

const SCROLL_PAGE: usize = 256;

#[derive(Clone)]
pub struct QdrantVectorIndex {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    client: Client,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchPoint {
    id: Value,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    payload: Option<ArticlePayload>,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<ScrollPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    id: Value,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: Value,
}

/// Vector layout of a collection that already exists.
#[derive(Debug, PartialEq)]
enum ExistingVectors {
    Single(usize),
    /// Named vectors, which the unnamed search and upsert bodies cannot address.
    Named(Vec<String>),
}

impl ExistingVectors {
    fn from_params(vectors: &Value) -> Result<Self, ApiError> {
        if let Some(size) = vectors.get("size").and_then(Value::as_u64) {
            return Ok(ExistingVectors::Single(size as usize));
        }
        match vectors.as_object() {
            Some(named) if !named.is_empty() => {
                Ok(ExistingVectors::Named(named.keys().cloned().collect()))
            }
            _ => Err(ApiError::Internal(format!(
                "unrecognised Qdrant vectors config: {}",
                vectors
            ))),
        }
    }
}

impl QdrantVectorIndex {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            collection: collection.to_string(),
            client,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.base_url,
            urlencoding::encode(&self.collection),
            suffix
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        builder: RequestBuilder,
        action: &str,
    ) -> Result<T, ApiError> {
        let res = builder.send().await.map_err(ApiError::transport)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Qdrant {} failed ({}): {}",
                action, status, text
            )));
        }
        let body: QdrantResponse<T> = res.json().await.map_err(ApiError::decode)?;
        Ok(body.result)
    }

    async fn existing_vectors(&self) -> Result<Option<ExistingVectors>, ApiError> {
        let res = self
            .request(Method::GET, self.collection_url(""))
            .send()
            .await
            .map_err(ApiError::transport)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Qdrant get collection failed ({}): {}",
                status, text
            )));
        }

        let body: QdrantResponse<CollectionInfo> = res.json().await.map_err(ApiError::decode)?;
        ExistingVectors::from_params(&body.result.config.params.vectors).map(Some)
    }

    async fn create_collection(&self, dimension: usize) -> Result<(), ApiError> {
        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let _: Value = self
            .send(
                self.request(Method::PUT, self.collection_url("")).json(&body),
                "create collection",
            )
            .await?;
        Ok(())
    }

    async fn recreate_collection(&self, dimension: usize) -> Result<(), ApiError> {
        let _: Value = self
            .send(
                self.request(Method::DELETE, self.collection_url("")),
                "delete collection",
            )
            .await?;
        self.create_collection(dimension).await
    }
}

/// Qdrant point ids are unsigned integers or UUID strings.
fn point_id(value: &Value) -> Option<PointId> {
    match value {
        Value::Number(n) => n.as_u64().map(PointId::Num),
        Value::String(s) => Some(
            s.parse()
                .map(PointId::Num)
                .unwrap_or_else(|_| PointId::Uuid(s.clone())),
        ),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<(), ApiError> {
        match self.existing_vectors().await? {
            Some(ExistingVectors::Single(existing)) if existing == dimension => Ok(()),
            Some(existing) => {
                tracing::warn!(
                    collection = %self.collection,
                    "Qdrant collection layout {:?} does not match {} dimensions; recreating",
                    existing,
                    dimension
                );
                self.recreate_collection(dimension).await
            }
            None => self.create_collection(dimension).await,
        }
    }

    async fn check_collection(&self, dimension: usize) -> Result<(), ApiError> {
        match self.existing_vectors().await? {
            Some(ExistingVectors::Single(existing)) if existing == dimension => Ok(()),
            Some(ExistingVectors::Single(existing)) => Err(ApiError::BadRequest(format!(
                "collection '{}' stores {}-dimensional vectors but embeddings have {}",
                self.collection, existing, dimension
            ))),
            Some(ExistingVectors::Named(names)) => Err(ApiError::BadRequest(format!(
                "collection '{}' uses named vectors ({}); re-run the indexer to rebuild it",
                self.collection,
                names.join(", ")
            ))),
            None => self.create_collection(dimension).await,
        }
    }

    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<Value> = records
            .into_iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.vector,
                    "payload": record.payload,
                })
            })
            .collect();

        let _: Value = self
            .send(
                self.request(Method::PUT, self.collection_url("/points?wait=true"))
                    .json(&json!({ "points": points })),
                "upsert",
            )
            .await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let points: Vec<SearchPoint> = self
            .send(
                self.request(Method::POST, self.collection_url("/points/search"))
                    .json(&body),
                "search",
            )
            .await?;

        Ok(points
            .into_iter()
            .filter_map(|point| {
                let Some(id) = point_id(&point.id) else {
                    tracing::warn!(id = %point.id, "Skipping Qdrant point with unreadable id");
                    return None;
                };
                Some(ScoredRecord {
                    id,
                    payload: point.payload.unwrap_or_default(),
                    score: point.score,
                })
            })
            .collect())
    }

    async fn delete(&self, ids: &[PointId]) -> Result<usize, ApiError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let _: Value = self
            .send(
                self.request(Method::POST, self.collection_url("/points/delete?wait=true"))
                    .json(&json!({ "points": ids })),
                "delete",
            )
            .await?;
        // Qdrant does not report per-id existence; deletes are of ids just listed.
        Ok(ids.len())
    }

    async fn list_ids(&self) -> Result<Vec<PointId>, ApiError> {
        let mut ids = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE,
                "with_payload": false,
                "with_vector": false,
            });
            if let (Some(obj), Some(next)) = (body.as_object_mut(), offset.take()) {
                obj.insert("offset".to_string(), next);
            }

            let page: ScrollPage = self
                .send(
                    self.request(Method::POST, self.collection_url("/points/scroll"))
                        .json(&body),
                    "scroll",
                )
                .await?;

            ids.extend(page.points.iter().filter_map(|p| point_id(&p.id)));

            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let result: CountResult = self
            .send(
                self.request(Method::POST, self.collection_url("/points/count"))
                    .json(&json!({ "exact": true })),
                "count",
            )
            .await?;
        Ok(result.count)
    }
}
