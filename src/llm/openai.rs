use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, GenerationOptions};
use crate::core::errors::ApiError;

/// Any server speaking the OpenAI chat-completions dialect (LM Studio,
/// llama.cpp, Ollama, vLLM, OpenAI itself).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    options: GenerationOptions,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            options,
            client: Client::new(),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [ChatMessage::user(prompt)],
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = self.options.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = self.options.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut request = self.client.post(&url).json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::transport)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("chat completion error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::decode)?;
        Ok(completion_text(&payload))
    }
}

fn completion_text(payload: &Value) -> String {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_prompt_and_options() {
        let provider = OpenAiProvider::new(
            "http://localhost:1234/".to_string(),
            "qwen".to_string(),
            None,
            GenerationOptions {
                temperature: Some(0.2),
                max_tokens: None,
            },
        );

        let body = provider.request_body("Summarize");
        assert_eq!(body["model"], "qwen");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Summarize");
        assert_eq!(body["temperature"], 0.2);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(provider.base_url, "http://localhost:1234");
    }

    #[test]
    fn completion_text_tolerates_missing_content() {
        assert_eq!(
            completion_text(&json!({ "choices": [ { "message": { "content": "hi" } } ] })),
            "hi"
        );
        assert_eq!(completion_text(&json!({ "choices": [] })), "");
    }

    #[tokio::test]
    #[ignore]
    async fn live_lmstudio_generation() {
        let provider = OpenAiProvider::new(
            "http://localhost:1234".to_string(),
            "local-model".to_string(),
            None,
            GenerationOptions::default(),
        );
        match provider.generate("Hello").await {
            Ok(text) => println!("response: {}", text),
            Err(e) => panic!("Failed to reach LM Studio: {}", e),
        }
    }
}
