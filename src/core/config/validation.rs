use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
    }

    if let Some(scraper) = expect_optional_object(root, "scraper")? {
        validate_string_array_field(scraper, "scraper.seed_urls", "seed_urls")?;
        validate_string_array_field(scraper, "scraper.denylist", "denylist")?;
        validate_u64_field(
            scraper,
            "scraper.target_article_count",
            "target_article_count",
            1,
            100_000,
        )?;
        validate_u64_field(
            scraper,
            "scraper.min_content_chars",
            "min_content_chars",
            0,
            1_000_000,
        )?;
        validate_u64_field(
            scraper,
            "scraper.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
        validate_optional_string_field(scraper, "scraper.user_agent", "user_agent")?;
        validate_optional_string_field(scraper, "scraper.output_path", "output_path")?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_enum_field(index, "index.backend", "backend", &["sqlite", "qdrant"])?;
        validate_optional_string_field(index, "index.collection", "collection")?;
        validate_u64_field(index, "index.batch_size", "batch_size", 1, 10_000)?;
        validate_u64_field(
            index,
            "index.payload_text_chars",
            "payload_text_chars",
            1,
            1_000_000,
        )?;
        validate_u64_field(index, "index.title_chars", "title_chars", 1, 10_000)?;
        validate_optional_string_field(index, "index.qdrant_url", "qdrant_url")?;
        validate_u64_field(
            index,
            "index.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 1, 65_536)?;
        validate_u64_field(
            embedding,
            "embedding.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_enum_field(llm, "llm.provider", "provider", &["gemini", "openai"])?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            retrieval,
            "retrieval.snippet_chars",
            "snippet_chars",
            1,
            100_000,
        )?;
    }

    if let Some(history) = expect_optional_object(root, "history")? {
        validate_optional_string_field(history, "history.session_key", "session_key")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ConfigError::invalid(
            path,
            format!("expected one of {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::invalid(
                &format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_partial_config() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "retrieval": { "top_k": 5 },
            "index": { "backend": "qdrant", "qdrant_url": null }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_out_of_range_top_k() {
        let err = validate_config(&json!({ "retrieval": { "top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = validate_config(&json!({ "index": { "backend": "chroma" } })).unwrap_err();
        assert!(err.to_string().contains("index.backend"));
    }

    #[test]
    fn rejects_blank_denylist_entry() {
        let err =
            validate_config(&json!({ "scraper": { "denylist": ["video", " "] } })).unwrap_err();
        assert!(err.to_string().contains("scraper.denylist[1]"));
    }

    #[test]
    fn rejects_non_object_section() {
        assert!(validate_config(&json!({ "llm": "gemini" })).is_err());
    }
}
