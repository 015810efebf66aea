use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::config::{AppPaths, ScraperSettings};

/// One scraped article. Field aliases accept documents produced by other
/// scrapers (`text`/`body` for content, `link` for url).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "link")]
    pub url: String,
    #[serde(default, alias = "text", alias = "body")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// `scraper.output_path` when set, otherwise `articles.json` in the data dir.
pub fn articles_path(settings: &ScraperSettings, paths: &AppPaths) -> PathBuf {
    settings
        .output_path
        .clone()
        .unwrap_or_else(|| paths.articles_path.clone())
}

pub fn save_articles(path: &Path, articles: &[Article]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(articles)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let articles = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse articles in {}", path.display()))?;
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_keeps_unicode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("articles.json");
        let articles = vec![Article {
            title: "मुंबई में बारिश".to_string(),
            url: "https://news.example/rain".to_string(),
            content: "Heavy rain…".to_string(),
            source: None,
        }];

        save_articles(&path, &articles).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("मुंबई"));
        assert!(!raw.contains("source"));
        assert_eq!(load_articles(&path).unwrap(), articles);
    }

    #[test]
    fn aliases_are_accepted() {
        let articles: Vec<Article> = serde_json::from_str(
            r#"[{"title": "A", "link": "https://a.example", "body": "text", "source": "wire"}]"#,
        )
        .unwrap();
        assert_eq!(articles[0].url, "https://a.example");
        assert_eq!(articles[0].content, "text");
        assert_eq!(articles[0].source.as_deref(), Some("wire"));
    }
}
