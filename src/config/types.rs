use serde::Deserialize;

/// Main configuration structure for Crawlspace
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    /// URLs to start crawling from
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// How deep to follow links: 1 fetches only the seeds
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Maximum number of fetches in flight at once (pooled executor)
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    /// Which executor runs the fetches
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Redirects followed before a request fails
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            max_concurrent_requests: default_max_concurrent_requests(),
            executor: ExecutorKind::default(),
            request_timeout: default_request_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Executor used for fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Concurrent tokio tasks bounded by `max-concurrent-requests`
    #[default]
    Pooled,
    /// One fetch at a time, in discovery order
    Queued,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL)
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Crawlspace".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

fn default_depth() -> u32 {
    crate::crawler::DEFAULT_DEPTH
}

fn default_max_concurrent_requests() -> u32 {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_redirects() -> u32 {
    10
}
