use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::GenerationOptions;
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: String,
    options: GenerationOptions,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: String,
        options: GenerationOptions,
    ) -> Self {
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            options,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ]
        });

        let mut generation = serde_json::Map::new();
        if let Some(t) = self.options.temperature {
            generation.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = self.options.max_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(t));
        }
        if !generation.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("generationConfig".to_string(), Value::Object(generation));
            }
        }
        body
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini generateContent failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::decode)?;
        Ok(candidate_text(&payload))
    }
}

/// Text of the first candidate. Blocked or empty candidates yield "".
fn candidate_text(payload: &Value) -> String {
    payload["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    fn provider(options: GenerationOptions) -> GeminiProvider {
        GeminiProvider::new(None, "gemini-1.5-flash".to_string(), "k".to_string(), options)
    }

    fn provider_at(base_url: &str, api_key: &str) -> GeminiProvider {
        GeminiProvider::new(
            Some(base_url.to_string()),
            "gemini-1.5-flash".to_string(),
            api_key.to_string(),
            GenerationOptions::default(),
        )
    }

    #[test]
    fn endpoint_uses_default_host() {
        assert_eq!(
            provider(GenerationOptions::default()).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn generation_config_only_when_set() {
        let plain = provider(GenerationOptions::default()).request_body("q");
        assert!(plain.get("generationConfig").is_none());
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "q");

        let tuned = provider(GenerationOptions {
            temperature: None,
            max_tokens: Some(512),
        })
        .request_body("q");
        assert_eq!(tuned["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn candidate_text_joins_parts() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Article 1: " }, { "text": "summary" } ] } }
            ]
        });
        assert_eq!(candidate_text(&payload), "Article 1: summary");
    }

    #[test]
    fn blocked_response_is_empty() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(candidate_text(&payload), "");
    }

    #[tokio::test]
    async fn generate_sends_key_as_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "secret-key"))
            .and(query_param_is_missing("key"))
            .and(body_partial_json(json!({
                "contents": [ { "role": "user", "parts": [ { "text": "Summarize" } ] } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [ { "content": { "parts": [ { "text": "Budget passed." } ] } } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_at(&server.uri(), "secret-key")
            .generate("Summarize")
            .await
            .unwrap();
        assert_eq!(text, "Budget passed.");
    }

    #[tokio::test]
    async fn rejected_request_is_internal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let err = provider_at(&server.uri(), "secret-key")
            .generate("Summarize")
            .await
            .unwrap_err();
        match err {
            ApiError::Internal(detail) => assert!(detail.contains("429")),
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_host_does_not_leak_the_key() {
        let err = provider_at("http://127.0.0.1:9", "SECRETKEY123")
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
        assert!(!err.to_string().contains("SECRETKEY123"));
    }
}
