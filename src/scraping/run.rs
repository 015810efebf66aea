use std::collections::HashSet;

use tracing::{debug, info, warn};
use url::Url;

use super::article::Article;
use super::extract::{extract_hrefs, is_candidate, normalize_link, parse_article};
use super::source::PageSource;
use crate::core::config::ScraperSettings;

pub struct Scraper<S> {
    source: S,
    settings: ScraperSettings,
}

impl<S: PageSource> Scraper<S> {
    pub fn new(source: S, settings: ScraperSettings) -> Self {
        Self { source, settings }
    }

    /// Walk the seed pages in order until `target_article_count` articles are
    /// collected. Fetch failures are logged and skipped.
    pub async fn run(&self) -> Vec<Article> {
        let target = self.settings.target_article_count;
        let mut collected: Vec<Article> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for seed in &self.settings.seed_urls {
            if collected.len() >= target {
                break;
            }

            info!("Scraping {} ...", seed);
            let site_articles = self.scrape_site(seed, &mut seen, collected.len()).await;
            info!(
                site = %seed,
                added = site_articles.len(),
                "Collected {} so far",
                collected.len() + site_articles.len()
            );
            collected.extend(site_articles);
        }

        collected
    }

    async fn scrape_site(
        &self,
        seed: &str,
        seen: &mut HashSet<String>,
        already_collected: usize,
    ) -> Vec<Article> {
        let target = self.settings.target_article_count;
        let mut articles = Vec::new();

        let base = match Url::parse(seed) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %seed, error = %e, "Invalid seed url");
                return articles;
            }
        };

        let html = match self.source.fetch(&base).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %seed, error = %e, "Failed to fetch page");
                return articles;
            }
        };

        for href in extract_hrefs(&html) {
            if already_collected + articles.len() >= target {
                break;
            }

            let Some(link) = normalize_link(&base, &href) else {
                continue;
            };
            if !is_candidate(&link, &self.settings.denylist) {
                continue;
            }
            if !seen.insert(link.as_str().to_string()) {
                continue;
            }

            match self.source.fetch(&link).await {
                Ok(page) => {
                    match parse_article(&page, link.as_str(), self.settings.min_content_chars) {
                        Some(article) => articles.push(article),
                        None => debug!(url = %link, "Skipping page without article body"),
                    }
                }
                Err(e) => warn!(url = %link, error = %e, "Failed to fetch article"),
            }
        }

        articles
    }
}
