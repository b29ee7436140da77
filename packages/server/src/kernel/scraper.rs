//! HTTP web scraper - local fetch + readable-content extraction
//!
//! This implementation:
//! - Uses reqwest for HTTP requests with browser-like headers
//! - Uses scraper crate for HTML parsing
//! - Prefers main content containers over full-page text
//!
//! Limitations:
//! - No JavaScript rendering (static HTML sites only)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::traits::{BaseWebScraper, ScrapedContent};

/// Modern browser user agents, rotated per request to avoid bot detection.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15",
];

/// Containers tried in order before falling back to `<body>`.
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "article", "main", ".content", "#content", ".main", "#main", ".article", ".post",
];

/// Subtrees that never contribute readable text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript",
];

/// Statuses retried before giving up.
const RETRY_STATUSES: &[u16] = &[500, 502, 503, 504, 429, 403, 408];

const MAX_ATTEMPTS: u32 = 5;
const MIN_CONTENT_CHARS: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Validate that a string is an absolute http(s) URL with a host.
pub fn validate_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Web scraper using reqwest + scraper
pub struct HttpScraper {
    client: reqwest::Client,
    /// Body text is truncated to this many characters.
    max_content_chars: usize,
    next_agent: AtomicUsize,
}

impl HttpScraper {
    pub fn new(max_content_chars: usize) -> Result<Self> {
        use reqwest::header::{self, HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_content_chars,
            next_agent: AtomicUsize::new(0),
        })
    }

    fn user_agent(&self) -> &'static str {
        let idx = self.next_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[idx % USER_AGENTS.len()]
    }

    /// Fetch raw HTML, retrying transient failures with increasing delay.
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, self.user_agent())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if RETRY_STATUSES.contains(&status.as_u16()) && attempt < MAX_ATTEMPTS {
                        warn!(%url, %status, attempt, "retrying after HTTP error");
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                        continue;
                    }
                    if status == reqwest::StatusCode::FORBIDDEN {
                        bail!(
                            "Access forbidden (403). The website might be blocking automated requests."
                        );
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        bail!("Too many requests (429). Please try again later.");
                    }
                    if !status.is_success() {
                        bail!("HTTP {} for {}", status, url);
                    }

                    let content_type = response
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_lowercase();
                    if !content_type.contains("text/html") {
                        bail!("Not an HTML page (Content-Type: {})", content_type);
                    }

                    return response.text().await.context("Failed to read response body");
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    warn!(%url, error = %e, attempt, "retrying after transport error");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(e).context("Request timed out");
                }
                Err(e) if e.is_connect() => {
                    return Err(e).context(
                        "Connection error. The website might be blocking requests or experiencing issues.",
                    );
                }
                Err(e) => return Err(e).context("Request failed"),
            }
        }
    }

    /// Extract title, meta description, and readable body text.
    fn extract_content(&self, html: &str) -> Result<ScrapedContent> {
        let document = Html::parse_document(html);

        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let description = Selector::parse(r#"meta[name="description"]"#)
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        // Prefer a main content container; fall back to <body>, then the
        // whole document.
        let mut raw_text = String::new();
        for selector_str in MAIN_CONTENT_SELECTORS {
            if let Ok(selector) = Selector::parse(selector_str) {
                let mut matched = false;
                for element in document.select(&selector) {
                    matched = true;
                    visible_text(element, &mut raw_text);
                }
                if matched {
                    break;
                }
            }
        }
        if raw_text.trim().is_empty() {
            if let Ok(selector) = Selector::parse("body") {
                if let Some(body) = document.select(&selector).next() {
                    visible_text(body, &mut raw_text);
                }
            }
        }
        if raw_text.trim().is_empty() {
            visible_text(document.root_element(), &mut raw_text);
        }

        let clean_text = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");

        let char_count = clean_text.chars().count();
        if char_count < MIN_CONTENT_CHARS {
            bail!(
                "Insufficient content retrieved (only {} characters)",
                char_count
            );
        }

        let body = truncate_chars(&clean_text, self.max_content_chars).to_string();

        Ok(ScrapedContent {
            title,
            description,
            body,
        })
    }
}

/// Collect the visible text beneath an element, skipping non-content
/// subtrees (script, nav, footer and friends).
fn visible_text(element: ElementRef, out: &mut String) {
    for node in element.children() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child) = ElementRef::wrap(node) {
            if SKIP_TAGS.contains(&child.value().name()) {
                continue;
            }
            visible_text(child, out);
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[async_trait]
impl BaseWebScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        if !validate_url(url) {
            bail!("Invalid URL format. Please include http:// or https://");
        }

        debug!(%url, "fetching website content");
        let html = self.fetch_html(url).await?;
        let content = self.extract_content(&html)?;
        debug!(
            %url,
            title = %content.title,
            body_chars = content.body.chars().count(),
            "extracted website content"
        );

        Ok(content)
    }
}
