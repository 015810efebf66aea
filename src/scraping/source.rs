use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use url::Url;

use crate::core::config::ScraperSettings;

/// Where the scraper gets page HTML from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpPageSource {
    http: Client,
}

impl HttpPageSource {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .redirect(Policy::limited(8))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            bail!("http status {}", status.as_u16());
        }
        Ok(res.text().await?)
    }
}
