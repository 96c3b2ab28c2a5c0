//! Crawl progress tracking and completion detection
//!
//! `CrawlState` records which URLs were observed, which are in flight and which
//! have resolved. Completion is level-triggered: the session is complete the
//! moment the in-flight list becomes empty after a resolution.
//!
//! The type itself is not synchronized. The crawler keeps it behind a mutex and
//! performs every check-then-mark sequence inside a single lock guard.

use crate::state::PageState;
use std::collections::HashSet;
use thiserror::Error;

/// Misuse of the crawl state by its owner
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A URL resolved that was not in flight (double resolution or never dispatched)
    #[error("{url} resolved but was not being crawled")]
    NotBeingCrawled { url: String },

    /// A URL was dispatched after the session had already completed
    #[error("cannot dispatch {url}: crawl session already completed")]
    SessionComplete { url: String },
}

/// Progress of a single crawl session
#[derive(Debug, Default)]
pub struct CrawlState {
    /// URLs whose fetch fully resolved
    crawled_urls: HashSet<String>,

    /// Same URLs as `crawled_urls`, in resolution order
    crawl_order: Vec<String>,

    /// URLs observed at least once (seed, discovered link, redirect target)
    visited_urls: HashSet<String>,

    /// URLs dispatched to the executor and not yet resolved
    being_crawled_urls: Vec<String>,

    /// Set once the in-flight list drained; never reset
    complete: bool,
}

/// Point-in-time copy of a `CrawlState`, usable without holding the lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStateSnapshot {
    /// Crawled URLs in resolution order
    pub crawled_urls: Vec<String>,

    /// Visited URLs, sorted
    pub visited_urls: Vec<String>,

    /// In-flight URLs in dispatch order
    pub being_crawled_urls: Vec<String>,

    /// Whether the session has completed
    pub complete: bool,
}

impl CrawlState {
    /// Creates an empty state for a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a URL has been observed
    ///
    /// Returns true if the URL was not visited before.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if self.visited_urls.contains(url) {
            return false;
        }
        self.visited_urls.insert(url.to_string())
    }

    /// Records that a URL has been dispatched
    ///
    /// Eligibility (dedup, depth) is the caller's decision. The only thing
    /// refused here is dispatch after the session completed.
    pub fn mark_being_crawled(&mut self, url: &str) -> Result<(), StateError> {
        if self.complete {
            return Err(StateError::SessionComplete {
                url: url.to_string(),
            });
        }
        self.being_crawled_urls.push(url.to_string());
        Ok(())
    }

    /// Records that a dispatched URL resolved and evaluates completion
    ///
    /// Links discovered while processing `url` must already be marked as being
    /// crawled before this is called, otherwise the session can complete early.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The in-flight list is now empty; the session is complete
    /// * `Ok(false)` - Other URLs are still in flight
    /// * `Err(StateError::NotBeingCrawled)` - `url` was not in flight
    pub fn finished_crawling(&mut self, url: &str) -> Result<bool, StateError> {
        let position = self
            .being_crawled_urls
            .iter()
            .position(|u| u == url)
            .ok_or_else(|| StateError::NotBeingCrawled {
                url: url.to_string(),
            })?;
        self.being_crawled_urls.remove(position);

        if self.crawled_urls.insert(url.to_string()) {
            self.crawl_order.push(url.to_string());
        }

        if self.being_crawled_urls.is_empty() {
            self.complete = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Completes the session if nothing is in flight
    ///
    /// Used when a crawl call dispatched nothing at all. Returns true only for
    /// the call that performed the transition.
    pub fn complete_if_idle(&mut self) -> bool {
        if self.complete || !self.being_crawled_urls.is_empty() {
            return false;
        }
        self.complete = true;
        true
    }

    /// Returns true if the URL's fetch has resolved
    pub fn is_crawled(&self, url: &str) -> bool {
        self.crawled_urls.contains(url)
    }

    /// Returns true if the URL has been observed
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_urls.contains(url)
    }

    /// Returns true if the URL is currently in flight
    pub fn is_being_crawled(&self, url: &str) -> bool {
        self.being_crawled_urls.iter().any(|u| u == url)
    }

    /// Returns true once the session has completed
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the lifecycle position of a URL
    pub fn page_state(&self, url: &str) -> PageState {
        if self.is_crawled(url) {
            PageState::Crawled
        } else if self.is_being_crawled(url) {
            PageState::BeingCrawled
        } else if self.is_visited(url) {
            PageState::Visited
        } else {
            PageState::Unseen
        }
    }

    /// Crawled URLs in the order they resolved
    pub fn crawled_urls(&self) -> &[String] {
        &self.crawl_order
    }

    /// In-flight URLs in dispatch order
    pub fn being_crawled_urls(&self) -> &[String] {
        &self.being_crawled_urls
    }

    /// Visited URLs (unordered)
    pub fn visited_urls(&self) -> impl Iterator<Item = &str> {
        self.visited_urls.iter().map(String::as_str)
    }

    /// Copies the current state
    pub fn snapshot(&self) -> CrawlStateSnapshot {
        let mut visited_urls: Vec<String> = self.visited_urls.iter().cloned().collect();
        visited_urls.sort();

        CrawlStateSnapshot {
            crawled_urls: self.crawl_order.clone(),
            visited_urls,
            being_crawled_urls: self.being_crawled_urls.clone(),
            complete: self.complete,
        }
    }
}
