use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini", "openai")
    fn name(&self) -> &str;

    /// single-shot completion; an empty string means the model produced no usable text
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}
