//! HTTP fetcher implementation
//!
//! This module provides the default `Request` collaborator:
//! - Building HTTP clients with proper user agent strings
//! - GET requests following a bounded number of redirects
//! - Error classification into `RequestError`
//! - Link extraction from HTML responses

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::parser::extract_links;
use crate::crawler::{
    HttpResponse, Request, RequestError, RequestFactory, RequestFailure, RequestFuture,
    RequestResult, RequestSuccess,
};
use crate::url::normalize_url;
use futures::FutureExt;
use reqwest::header::REFERER;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `config` - Crawler settings (timeout, redirect limit)
///
/// # Example
///
/// ```no_run
/// use crawlspace::config::{CrawlerConfig, UserAgentConfig};
/// use crawlspace::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(config.request_timeout.min(10)))
        .redirect(Policy::limited(config.max_redirects as usize))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Creates `HttpRequest`s sharing one client
#[derive(Debug, Clone)]
pub struct HttpRequestFactory {
    client: Client,
}

impl HttpRequestFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RequestFactory for HttpRequestFactory {
    fn canonical_url(&self, url: &str) -> String {
        match normalize_url(url) {
            Ok(normalized) => normalized.into(),
            Err(e) => {
                tracing::debug!("Keeping {} as given: {}", url, e);
                url.to_string()
            }
        }
    }

    fn create_request(&self, referer: Option<&str>, url: &str) -> Box<dyn Request> {
        Box::new(HttpRequest {
            client: self.client.clone(),
            url: url.to_string(),
            referer: referer.map(str::to_string),
        })
    }
}

/// GET request for one URL
///
/// # Outcomes
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx/3xx, HTML | Success, links extracted from the body |
/// | 2xx/3xx, not HTML | Success, no links |
/// | 4xx/5xx | Failure `Status`, response attached |
/// | Timeout | Failure `Timeout` |
/// | Connection refused, DNS, TLS | Failure `Connect` |
/// | Too many redirects | Failure `Redirect` |
/// | Body read error | Failure `Body` |
#[derive(Debug)]
pub struct HttpRequest {
    client: Client,
    url: String,
    referer: Option<String>,
}

impl Request for HttpRequest {
    fn submit(self: Box<Self>) -> RequestFuture {
        let request = *self;
        request.fetch().boxed()
    }
}

impl HttpRequest {
    async fn fetch(self) -> RequestResult {
        let mut builder = self.client.get(&self.url);
        if let Some(referer) = &self.referer {
            builder = builder.header(REFERER, referer);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequestFailure::new(classify_error(&e)))?;

        let status = response.status();
        let page_url = response.url().clone();
        // Same form as extracted links, so a redirect target dedups against them
        let final_url = normalize_url(page_url.as_str())
            .map(String::from)
            .unwrap_or_else(|_| page_url.to_string());
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| RequestFailure::new(RequestError::Body(e.to_string())))?;

        let response = Arc::new(HttpResponse {
            url: final_url.clone(),
            status_code: status.as_u16(),
            headers,
            body: body.to_vec(),
        });

        if status.is_client_error() || status.is_server_error() {
            return Err(RequestFailure::with_response(
                RequestError::Status(status.as_u16()),
                response,
            ));
        }

        let visited_urls = if response.is_html() {
            let links = extract_links(&response.text(), &page_url);
            tracing::trace!("Parsed {} ({} links)", final_url, links.len());
            links
        } else {
            Vec::new()
        };

        Ok(RequestSuccess {
            visited_urls,
            last_visited_url: final_url,
            response,
        })
    }
}

/// Maps a reqwest error onto the crawler's error taxonomy
fn classify_error(error: &reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::Timeout
    } else if error.is_redirect() {
        RequestError::Redirect(error.to_string())
    } else if error.is_connect() {
        RequestError::Connect(error.to_string())
    } else {
        RequestError::Transport(error.to_string())
    }
}
