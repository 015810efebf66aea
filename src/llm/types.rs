use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling knobs shared by every provider. `None` leaves the provider default.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}
