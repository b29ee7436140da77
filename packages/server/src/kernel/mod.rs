//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod openai;
pub mod scraper;
pub mod serpapi_client;
pub mod tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use openai::OpenAiCompletions;
pub use scraper::{validate_url, HttpScraper};
pub use serpapi_client::SerpApiClient;
pub use test_dependencies::TestDependencies;
pub use traits::*;
