use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Internal("embedding provider returned no vector".to_string()))
    }
}
