//! Crawlspace: a recursive web crawler core
//!
//! This crate fetches pages concurrently starting from a seed URL, deduplicates
//! work, tracks which URLs are in flight versus fully resolved, and reports each
//! page outcome plus a single "finished" notification once nothing is left in
//! flight. Transport and scheduling are pluggable through the `Request` and
//! `Executor` traits.

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Crawlspace operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Executor error: {0}")]
    Executor(#[from] crawler::ExecutorError),

    #[error("Crawl state error: {0}")]
    State(#[from] state::StateError),

    #[error("Crawl session has already finished")]
    SessionFinished,

    #[error("Crawl session was dropped before it finished")]
    SessionAbandoned,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOptions, CrawlOutcome, Crawler};
pub use state::{CrawlState, PageState};
pub use url::normalize_url;
