//! Typed view of the merged configuration.
//!
//! Every field has a default so an empty `config.yml` yields a runnable
//! local setup; only credentials for hosted collaborators must be supplied.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub scraper: ScraperSettings,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub seed_urls: Vec<String>,
    pub target_article_count: usize,
    pub min_content_chars: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub denylist: Vec<String>,
    /// Overrides `<data_dir>/articles.json`.
    pub output_path: Option<PathBuf>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            seed_urls: [
                "https://www.bbc.com/news",
                "https://timesofindia.indiatimes.com/news",
                "https://indianexpress.com/section/india/",
                "https://www.hindustantimes.com/india-news",
                "https://www.livemint.com/latest-news",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target_article_count: 50,
            min_content_chars: 200,
            request_timeout_secs: 10,
            user_agent: "Mozilla/5.0".to_string(),
            denylist: ["#", "video", "liveblog", "photos", "sports", "cricket"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Sqlite,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub collection: String,
    pub batch_size: usize,
    pub payload_text_chars: usize,
    pub title_chars: usize,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Sqlite,
            collection: "news_articles".to_string(),
            batch_size: 64,
            payload_text_chars: 4000,
            title_chars: 250,
            qdrant_url: None,
            qdrant_api_key: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub model: String,
    /// Defaults per provider when unset.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Gemini,
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub snippet_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            snippet_chars: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub session_key: String,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            session_key: "chat_history".to_string(),
        }
    }
}

impl Settings {
    /// Credentials the answer service cannot start without.
    pub fn require_llm_credentials(&self) -> Result<(), ConfigError> {
        if self.llm.provider == LlmProviderKind::Gemini && is_blank(&self.llm.api_key) {
            return Err(ConfigError::Missing(
                "llm.api_key (or GEMINI_API_KEY)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn require_index_endpoint(&self) -> Result<(), ConfigError> {
        if self.index.backend == IndexBackend::Qdrant && is_blank(&self.index.qdrant_url) {
            return Err(ConfigError::Missing(
                "index.qdrant_url (or QDRANT_URL)".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_uses_defaults() {
        let settings: Settings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.snippet_chars, 600);
        assert_eq!(settings.index.backend, IndexBackend::Sqlite);
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.history.session_key, "chat_history");
        assert_eq!(settings.scraper.denylist.len(), 6);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "index": { "backend": "qdrant", "qdrant_url": "https://example.cloud" },
            "llm": { "provider": "openai", "model": "local" }
        }))
        .unwrap();

        assert_eq!(settings.index.backend, IndexBackend::Qdrant);
        assert_eq!(settings.index.collection, "news_articles");
        assert_eq!(settings.llm.provider, LlmProviderKind::OpenAi);
        assert!(settings.require_index_endpoint().is_ok());
        assert!(settings.require_llm_credentials().is_ok());
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let settings = Settings::default();
        let err = settings.require_llm_credentials().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn qdrant_without_url_is_rejected() {
        let mut settings = Settings::default();
        settings.index.backend = IndexBackend::Qdrant;
        settings.index.qdrant_url = Some("   ".to_string());
        assert!(settings.require_index_endpoint().is_err());
    }
}
