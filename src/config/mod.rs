//! Configuration module for Crawlspace
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawlspace::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawlspace.toml")).unwrap();
//! println!("Crawler will follow links {} levels deep", config.crawler.depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ExecutorKind, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
