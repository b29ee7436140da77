use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub serpapi_api_key: String,
    /// Website content is truncated to this many characters before storage
    /// and prompting.
    pub max_website_content_length: usize,
    /// Organic results requested per keyword from the search provider.
    pub results_per_keyword: u32,
    /// How long a continuation claim on a job stays valid.
    pub claim_ttl_seconds: i64,
    /// How often the reaper sweeps for expired claims.
    pub reaper_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string()),
            serpapi_api_key: env::var("SERPAPI_API_KEY").context("SERPAPI_API_KEY must be set")?,
            max_website_content_length: env::var("MAX_WEBSITE_CONTENT_LENGTH")
                .unwrap_or_else(|_| "20000".to_string())
                .parse()
                .context("MAX_WEBSITE_CONTENT_LENGTH must be a valid number")?,
            results_per_keyword: env::var("RESULTS_PER_KEYWORD")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("RESULTS_PER_KEYWORD must be a valid number")?,
            claim_ttl_seconds: env::var("CLAIM_TTL_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("CLAIM_TTL_SECONDS must be a valid number")?,
            reaper_interval_seconds: env::var("REAPER_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("REAPER_INTERVAL_SECONDS must be a valid number")?,
        })
    }
}
