// TestDependencies - mock implementations for testing
//
// Provides mock adapters that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::tasks::PostgresTaskQueue;
use super::{
    BaseCompletions, BaseSearchProvider, BaseWebScraper, ScrapedContent, SearchResult, ServerDeps,
};

// =============================================================================
// Mock Web Scraper
// =============================================================================

pub struct MockWebScraper {
    responses: Arc<Mutex<Vec<Result<ScrapedContent, String>>>>,
    scrape_calls: Arc<Mutex<Vec<String>>>,
}

impl MockWebScraper {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            scrape_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful scrape with the given body text.
    pub fn with_page(self, body: &str) -> Self {
        let content = ScrapedContent {
            title: "Test Page".to_string(),
            description: "A page used in tests".to_string(),
            body: body.to_string(),
        };
        self.responses.lock().unwrap().push(Ok(content));
        self
    }

    /// Queue a successful scrape with full control over the fields.
    pub fn with_content(self, content: ScrapedContent) -> Self {
        self.responses.lock().unwrap().push(Ok(content));
        self
    }

    /// Queue a scrape failure.
    pub fn with_error(self, message: &str) -> Self {
        self.responses.lock().unwrap().push(Err(message.to_string()));
        self
    }

    /// Get all URLs that were scraped
    pub fn scrape_calls(&self) -> Vec<String> {
        self.scrape_calls.lock().unwrap().clone()
    }

    /// Check if a URL was scraped
    pub fn was_scraped(&self, url: &str) -> bool {
        self.scrape_calls.lock().unwrap().iter().any(|u| u == url)
    }

    pub fn call_count(&self) -> usize {
        self.scrape_calls.lock().unwrap().len()
    }
}

impl Default for MockWebScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseWebScraper for MockWebScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        self.scrape_calls.lock().unwrap().push(url.to_string());

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return responses.remove(0).map_err(|message| anyhow!(message));
        }

        // Default: plausible page content long enough to pass extraction
        // and step validity checks.
        Ok(ScrapedContent {
            title: "Mock Page".to_string(),
            description: "Mock description".to_string(),
            body: "Mock scraped body content. ".repeat(10),
        })
    }
}

// =============================================================================
// Mock Search Provider
// =============================================================================

pub struct MockSearchProvider {
    responses: Arc<Mutex<HashMap<String, Result<Vec<SearchResult>, String>>>>,
    search_calls: Arc<Mutex<Vec<String>>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            search_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the results returned for a keyword.
    pub fn with_results(self, keyword: &str, results: Vec<SearchResult>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(keyword.to_string(), Ok(results));
        self
    }

    /// Make searches for a keyword fail.
    pub fn with_error(self, keyword: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(keyword.to_string(), Err(message.to_string()));
        self
    }

    /// Get all keywords that were searched, in order
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }
}

impl Default for MockSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build `n` distinct results for a keyword, for test arrangement.
pub fn search_results_for(keyword: &str, n: usize) -> Vec<SearchResult> {
    (1..=n)
        .map(|i| SearchResult {
            title: format!("Result {} for {}", i, keyword),
            link: format!("https://example.com/{}/{}", keyword, i),
            snippet: format!("Snippet {} about {}", i, keyword),
            position: i as i32,
        })
        .collect()
}

#[async_trait]
impl BaseSearchProvider for MockSearchProvider {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        self.search_calls.lock().unwrap().push(keyword.to_string());

        match self.responses.lock().unwrap().get(keyword) {
            Some(Ok(results)) => Ok(results.clone()),
            Some(Err(message)) => Err(anyhow!(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Mock Completions
// =============================================================================

/// Long enough to pass the stored-output validity check.
const DEFAULT_COMPLETION: &str = "Mock completion output with enough substance to look like a \
    real model response. It covers the requested analysis in several sentences so downstream \
    validity checks treat it as a usable artifact.";

pub struct MockCompletions {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockCompletions {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response; responses are consumed in FIFO order.
    pub fn with_response(self, response: &str) -> Self {
        self.responses.lock().unwrap().push(Ok(response.to_string()));
        self
    }

    /// Queue a completion failure.
    pub fn with_error(self, message: &str) -> Self {
        self.responses.lock().unwrap().push(Err(message.to_string()));
        self
    }

    /// All (system, user) prompt pairs seen, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockCompletions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCompletions for MockCompletions {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return responses.remove(0).map_err(|message| anyhow!(message));
        }

        Ok(DEFAULT_COMPLETION.to_string())
    }
}

// =============================================================================
// Aggregate test dependencies
// =============================================================================

/// Bundle of mock adapters plus handles for assertions.
///
/// Tests keep the `Arc`s to inspect recorded calls after acting through
/// `ServerDeps`.
pub struct TestDependencies {
    pub scraper: Arc<MockWebScraper>,
    pub search: Arc<MockSearchProvider>,
    pub completions: Arc<MockCompletions>,
}

impl TestDependencies {
    pub fn new(
        scraper: MockWebScraper,
        search: MockSearchProvider,
        completions: MockCompletions,
    ) -> Self {
        Self {
            scraper: Arc::new(scraper),
            search: Arc::new(search),
            completions: Arc::new(completions),
        }
    }

    /// Build ServerDeps over a real pool with these mocks and a real
    /// Postgres task queue.
    pub fn server_deps(&self, pool: PgPool) -> ServerDeps {
        let tasks = Arc::new(PostgresTaskQueue::new(pool.clone()));
        ServerDeps::new(
            pool,
            self.scraper.clone(),
            self.search.clone(),
            self.completions.clone(),
            tasks,
            600,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new(
            MockWebScraper::new(),
            MockSearchProvider::new(),
            MockCompletions::new(),
        )
    }
}
