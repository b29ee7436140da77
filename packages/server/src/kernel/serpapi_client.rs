//! SerpAPI client for Google keyword searches.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::traits::{BaseSearchProvider, SearchResult};

const SERPAPI_BASE_URL: &str = "https://serpapi.com/search";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// SerpAPI client for web search
pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    results_per_query: u32,
}

/// SerpAPI response envelope
#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    inline_videos: Vec<InlineVideo>,
    #[serde(default)]
    error: Option<String>,
}

/// Individual organic result from SerpAPI
#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    position: i32,
}

/// Inline video result from SerpAPI
#[derive(Debug, Deserialize)]
struct InlineVideo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    position: i32,
}

impl SerpApiClient {
    /// Create a new SerpAPI client
    pub fn new(api_key: String, results_per_query: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: SERPAPI_BASE_URL.to_string(),
            results_per_query,
        })
    }

    /// Set a custom base URL (for tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, keyword: &str) -> Result<SerpApiResponse> {
        let num = self.results_per_query.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", keyword),
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("Failed to send SerpAPI request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("SerpAPI HTTP {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse SerpAPI response")
    }
}

fn convert(response: SerpApiResponse) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for r in response.organic_results {
        results.push(SearchResult {
            title: r.title,
            link: r.link,
            snippet: r.snippet,
            position: r.position,
        });
    }

    for v in response.inline_videos {
        results.push(SearchResult {
            title: v.title,
            link: v.link,
            snippet: format!("Video by {} - Duration: {}", v.channel, v.duration),
            position: v.position,
        });
    }

    results
}

#[async_trait]
impl BaseSearchProvider for SerpApiClient {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch(keyword).await {
                Ok(data) => {
                    let api_error = data.error.clone();
                    let results = convert(data);
                    if !results.is_empty() {
                        return Ok(results);
                    }
                    match api_error {
                        Some(message) if attempt < MAX_ATTEMPTS => {
                            warn!(
                                %keyword,
                                error = %message,
                                attempt,
                                "SerpAPI reported an error, retrying"
                            );
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                        Some(message) => bail!("SerpAPI error: {}", message),
                        None => {
                            warn!(%keyword, "no results in SerpAPI response");
                            return Ok(Vec::new());
                        }
                    }
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(%keyword, error = %e, attempt, "SerpAPI request failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
