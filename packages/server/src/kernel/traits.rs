// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "build a brand brief") should be domain functions
// that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseWebScraper)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// Web Scraper Trait (Infrastructure - fetch + extract page content)
// =============================================================================

/// Readable content extracted from a single page.
#[derive(Debug, Clone, Default)]
pub struct ScrapedContent {
    pub title: String,
    pub description: String,
    /// Main visible text, whitespace-collapsed and truncated to the
    /// configured cap.
    pub body: String,
}

impl ScrapedContent {
    /// Render in the form the analysis prompts expect.
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Title: {}\nDescription: {}\nBody: {}",
            self.title, self.description, self.body
        )
    }
}

#[async_trait]
pub trait BaseWebScraper: Send + Sync {
    /// Fetch a URL and extract its readable content.
    ///
    /// Malformed URLs are rejected without a network call. Transient HTTP
    /// failures are retried internally; the returned error represents a
    /// site that could not be read at all.
    async fn scrape(&self, url: &str) -> Result<ScrapedContent>;
}

// =============================================================================
// Search Provider Trait (Infrastructure - keyword SERP lookup)
// =============================================================================

/// One organic search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub position: i32,
}

#[async_trait]
pub trait BaseSearchProvider: Send + Sync {
    /// Fetch organic results for one keyword.
    ///
    /// Transient failures are retried internally. An empty Vec is a valid
    /// answer (keyword has no results), not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>>;
}

// =============================================================================
// Completions Trait (Infrastructure - LLM text generation)
// =============================================================================

#[async_trait]
pub trait BaseCompletions: Send + Sync {
    /// Run a system + user prompt pair and return the raw text response.
    ///
    /// Rate limits and server errors are retried internally with backoff.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
