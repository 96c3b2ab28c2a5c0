/// Page state definitions for tracking crawl progress
///
/// This module defines the positions a URL moves through during a crawl session.
use std::fmt;

/// Represents the current state of a URL within a crawl session
///
/// A URL only ever moves forward: `Unseen -> Visited -> BeingCrawled -> Crawled`.
/// A URL can stop at `Visited` when it was observed (for example as a redirect
/// target) without being dispatched itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// URL has never been observed in this session
    Unseen,

    /// URL has been observed and will not be dispatched again
    Visited,

    /// URL has been handed to the executor and has not resolved yet
    BeingCrawled,

    /// URL's fetch resolved and its success or failure was processed
    Crawled,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing will happen)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Crawled)
    }

    /// Returns true if work for this URL is still outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::BeingCrawled)
    }

    /// Returns true if the URL is known to the session and must not be dispatched again
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unseen)
    }

    /// Short lowercase name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Visited => "visited",
            Self::BeingCrawled => "being_crawled",
            Self::Crawled => "crawled",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
