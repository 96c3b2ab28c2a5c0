//! Page outcomes reported to the crawl callbacks
//!
//! A `CrawlOutcome` is built from a request's success or failure payload once
//! the request resolves.

use crate::crawler::{HttpResponse, RequestError, RequestFailure};
use std::sync::Arc;

/// What the page callbacks receive for every resolved URL
///
/// Successes and failures share one shape; `error` tells them apart.
/// `content` and `body` always carry the same decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// The URL that was requested
    pub url: String,

    /// Response status code, absent when the server never answered
    pub status: Option<u16>,

    /// Decoded response body
    pub content: String,

    /// `None` on success
    pub error: Option<RequestError>,

    /// The raw response, absent when the server never answered
    pub response: Option<Arc<HttpResponse>>,

    /// Decoded response body (same as `content`)
    pub body: String,

    /// Page the URL was discovered on; empty for a seed
    pub referer: String,
}

impl CrawlOutcome {
    pub(crate) fn success(url: &str, referer: Option<&str>, response: Arc<HttpResponse>) -> Self {
        let text = response.text();
        Self {
            url: url.to_string(),
            status: Some(response.status_code),
            content: text.clone(),
            error: None,
            response: Some(response),
            body: text,
            referer: referer.unwrap_or_default().to_string(),
        }
    }

    pub(crate) fn failure(url: &str, referer: Option<&str>, failure: RequestFailure) -> Self {
        let text = failure
            .response
            .as_ref()
            .map(|response| response.text())
            .unwrap_or_default();
        Self {
            url: url.to_string(),
            status: failure.response.as_ref().map(|response| response.status_code),
            content: text.clone(),
            error: Some(failure.error),
            response: failure.response,
            body: text,
            referer: referer.unwrap_or_default().to_string(),
        }
    }

    /// Returns true if the fetch succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
