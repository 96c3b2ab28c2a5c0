//! URL handling module for Crawlspace
//!
//! The crawl core compares URLs by exact string match. This module provides the
//! normalization applied to discovered links so that trivially different
//! spellings of the same page dedup to one entry.

mod normalize;

// Re-export main functions
pub use normalize::{normalize_url, resolve_link};
