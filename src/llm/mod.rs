mod gemini;
mod openai;
mod provider;
mod types;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, GenerationOptions};

use std::sync::Arc;

use crate::core::config::{LlmProviderKind, LlmSettings};
use crate::core::errors::ApiError;

/// Builds the provider selected in `llm.provider`.
pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let options = GenerationOptions {
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    };

    let provider: Arc<dyn LlmProvider> = match settings.provider {
        LlmProviderKind::Gemini => {
            let api_key = settings
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("Gemini requires llm.api_key".to_string()))?;
            Arc::new(GeminiProvider::new(
                settings.base_url.clone(),
                settings.model.clone(),
                api_key,
                options,
            ))
        }
        LlmProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            settings
                .base_url
                .clone()
                .unwrap_or_else(|| "http://127.0.0.1:1234".to_string()),
            settings.model.clone(),
            settings.api_key.clone(),
            options,
        )),
    };
    Ok(provider)
}
