//! HTTP client for source adapters
//!
//! Creates clients with a bounded timeout, a rotating browser user agent and
//! an optional proxy.

use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

/// Source adapter configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Optional proxy URL (http://, socks5h://)
    pub proxy: Option<String>,
    /// Search queries issued per news category
    pub queries_per_category: usize,
    /// Result cards kept per news query
    pub max_articles_per_query: usize,
    /// Articles kept per news category
    pub max_articles_per_category: usize,
    /// Maximum concurrent news queries
    pub max_concurrent: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            proxy: None,
            queries_per_category: 2,
            max_articles_per_query: 8,
            max_articles_per_category: 5,
            max_concurrent: 4,
        }
    }
}

impl SourceConfig {
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Errors from source adapters
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Could not parse {0}")]
    Parse(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create an HTTP client for source fetches
pub fn create_client(config: &SourceConfig) -> Result<Client, SourceError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(random_user_agent());

    if let Some(proxy_url) = &config.proxy {
        let proxy = Proxy::all(proxy_url).map_err(|e| SourceError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| SourceError::ClientBuild(e.to_string()))
}

/// Check whether the news source answers
pub async fn check_connectivity(config: &SourceConfig) -> Result<bool, SourceError> {
    let client = create_client(config)?;

    let result = client.get(crate::GOOGLE_NEWS_URL).send().await;

    match result {
        Ok(resp) => Ok(resp.status().is_success() || resp.status().is_redirection()),
        Err(_) => Ok(false),
    }
}
