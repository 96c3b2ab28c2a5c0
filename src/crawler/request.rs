//! Request contract: one fetch for one URL
//!
//! A `Request` is consumed by `submit`, so it can only resolve once. Retry and
//! timeout policy, if any, belong to the implementation; the crawler treats the
//! result as final.

use crate::crawler::HttpResponse;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

/// Why a fetch did not produce a usable page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Server answered with an error status (4xx/5xx)
    #[error("HTTP {0}")]
    Status(u16),

    /// Request did not complete in time
    #[error("Request timeout")]
    Timeout,

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Redirect loop or too many redirects
    #[error("Redirect error: {0}")]
    Redirect(String),

    /// Response arrived but its body could not be read
    #[error("Failed to read body: {0}")]
    Body(String),

    /// Any other transport failure
    #[error("{0}")]
    Transport(String),
}

/// Payload of a successful fetch
#[derive(Debug, Clone)]
pub struct RequestSuccess {
    /// URLs discovered on the fetched page
    pub visited_urls: Vec<String>,

    /// URL the fetch ended on (differs from the requested URL after redirects)
    pub last_visited_url: String,

    /// The response itself
    pub response: Arc<HttpResponse>,
}

/// Payload of a failed fetch
#[derive(Debug, Clone)]
pub struct RequestFailure {
    /// What went wrong
    pub error: RequestError,

    /// The response, when the server answered at all
    pub response: Option<Arc<HttpResponse>>,
}

impl RequestFailure {
    /// A failure without a response (transport error)
    pub fn new(error: RequestError) -> Self {
        Self {
            error,
            response: None,
        }
    }

    /// A failure the server answered
    pub fn with_response(error: RequestError, response: Arc<HttpResponse>) -> Self {
        Self {
            error,
            response: Some(response),
        }
    }
}

/// Result of submitting a request
pub type RequestResult = Result<RequestSuccess, RequestFailure>;

/// Future returned by `Request::submit`
pub type RequestFuture = BoxFuture<'static, RequestResult>;

/// A single fetch, resolved exactly once
pub trait Request: Send {
    /// Performs the fetch
    fn submit(self: Box<Self>) -> RequestFuture;
}

/// Creates a request for a URL
///
/// `referer` is the page the URL was discovered on, `None` for a seed.
/// Closures with the matching signature implement this trait.
pub trait RequestFactory: Send + Sync {
    /// The form of `url` used for dedup, applied to seeds before dispatch
    ///
    /// Links returned in `RequestSuccess::visited_urls` and `last_visited_url`
    /// should already be in this form. Defaults to the URL unchanged.
    fn canonical_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn create_request(&self, referer: Option<&str>, url: &str) -> Box<dyn Request>;
}

impl<F> RequestFactory for F
where
    F: Fn(Option<&str>, &str) -> Box<dyn Request> + Send + Sync,
{
    fn create_request(&self, referer: Option<&str>, url: &str) -> Box<dyn Request> {
        self(referer, url)
    }
}
