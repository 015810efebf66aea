use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Environment variables mapped onto config paths. Later entries win when two
/// variables target the same path.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 17] = [
    ("NEWSRAG_HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
    ("TARGET_ARTICLE_COUNT", &["scraper", "target_article_count"], EnvKind::Integer),
    ("ARTICLES_PATH", &["scraper", "output_path"], EnvKind::Text),
    ("INDEX_BACKEND", &["index", "backend"], EnvKind::Text),
    ("QDRANT_URL", &["index", "qdrant_url"], EnvKind::Text),
    ("QDRANT_API_KEY", &["index", "qdrant_api_key"], EnvKind::Text),
    ("QDRANT_COLLECTION", &["index", "collection"], EnvKind::Text),
    ("EMBEDDING_BASE_URL", &["embedding", "base_url"], EnvKind::Text),
    ("EMBEDDING_MODEL", &["embedding", "model"], EnvKind::Text),
    ("EMBEDDING_API_KEY", &["embedding", "api_key"], EnvKind::Text),
    ("LLM_PROVIDER", &["llm", "provider"], EnvKind::Text),
    ("LLM_MODEL", &["llm", "model"], EnvKind::Text),
    ("LLM_BASE_URL", &["llm", "base_url"], EnvKind::Text),
    ("GEMINI_API_KEY", &["llm", "api_key"], EnvKind::Text),
    ("LLM_API_KEY", &["llm", "api_key"], EnvKind::Text),
    ("TOP_K", &["retrieval", "top_k"], EnvKind::Integer),
];

#[derive(Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("NEWSRAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let data_config = self.paths.data_dir.join("config.yml");
        if data_config.exists() {
            return data_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config deep-merged with the secrets file. Missing files count as
    /// empty; unreadable or malformed ones are errors.
    pub fn load_config(&self) -> Result<Value, ConfigError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Merged files plus process environment, validated and typed.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let mut config = self.load_config()?;
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        settings_from_value(&config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(config: &Value) -> Result<Settings, ConfigError> {
    validate_config(config)?;
    serde_json::from_value(config.clone()).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Parse(format!(
            "{}: top level must be a mapping",
            path.display()
        ))),
    }
}

pub(crate) fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, path, kind) in ENV_OVERRIDES.iter() {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match kind {
            EnvKind::Text => Value::String(raw.to_string()),
            EnvKind::Integer => match raw.parse::<u64>() {
                Ok(number) => Value::from(number),
                Err(_) => {
                    tracing::warn!("Ignoring {}: '{}' is not an integer", var, raw);
                    continue;
                }
            },
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, item) in map {
                let next = if is_sensitive_key(key) && !item.is_null() && !item.is_object() {
                    Value::String(REDACT_PLACEHOLDER.to_string())
                } else {
                    redact_sensitive_values(item)
                };
                redacted.insert(key.clone(), next);
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    if SENSITIVE_WHITELIST.contains(&lowered.as_str()) {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
