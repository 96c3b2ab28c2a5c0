//! Crawler coordinator - crawl orchestration logic
//!
//! This module ties the crawl state, the request factory and the executor
//! together:
//! - Deduplicating URLs before dispatch
//! - Submitting one task per dispatched URL
//! - Dispatching discovered links while depth allows
//! - Detecting completion and notifying `finished` exactly once
//!
//! All session bookkeeping lives behind one mutex. Dedup checks and the
//! visited/being-crawled marks happen under a single guard, and no callback or
//! collaborator is ever invoked while that guard is held.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::executor::executor_factory;
use crate::crawler::fetcher::{build_http_client, HttpRequestFactory};
use crate::crawler::{
    lock, CrawlOutcome, Executor, ExecutorFactory, RequestFactory, RequestResult, Task,
};
use crate::state::{CrawlState, CrawlStateSnapshot, PageState};
use crate::CrawlError;
use futures::FutureExt;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Depth used when `CrawlOptions::depth` is not set
pub const DEFAULT_DEPTH: u32 = 2;

/// Per-page callback, invoked for successes or failures
pub type PageCallback = Arc<dyn Fn(CrawlOutcome) + Send + Sync>;

/// Invoked once with every crawled URL when the session completes
pub type FinishedCallback = Box<dyn FnOnce(Vec<String>) + Send>;

/// Decides whether a URL may be dispatched at all
pub type UrlFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Arguments of a single `Crawler::crawl` call
///
/// # Example
///
/// ```no_run
/// use crawlspace::CrawlOptions;
///
/// let options = CrawlOptions::new("https://example.com/")
///     .depth(3)
///     .on_success(|page| println!("{} -> {:?}", page.url, page.status))
///     .on_failure(|page| eprintln!("{} failed: {:?}", page.url, page.error))
///     .on_finished(|urls| println!("crawled {} pages", urls.len()));
/// ```
pub struct CrawlOptions {
    /// Seed URL
    pub url: String,

    /// 0: do not fetch the seed; 1: fetch the seed only; n: follow links n - 1 levels deep
    pub depth: u32,

    /// Called for every page that fetched successfully
    pub success: PageCallback,

    /// Called for every page whose fetch failed; links on it are not followed
    pub failure: PageCallback,

    /// Called once with every crawled URL when the session completes
    pub finished: Option<FinishedCallback>,

    /// URLs rejected by the filter are skipped without being marked visited
    pub should_crawl: Option<UrlFilter>,
}

impl CrawlOptions {
    /// Options for `url` with the default depth and no-op callbacks
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: DEFAULT_DEPTH,
            success: Arc::new(|_: CrawlOutcome| {}),
            failure: Arc::new(|_: CrawlOutcome| {}),
            finished: None,
            should_crawl: None,
        }
    }

    /// Sets how many levels of links to follow
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the callback for successful pages
    pub fn on_success(mut self, callback: impl Fn(CrawlOutcome) + Send + Sync + 'static) -> Self {
        self.success = Arc::new(callback);
        self
    }

    /// Sets the callback for failed pages
    pub fn on_failure(mut self, callback: impl Fn(CrawlOutcome) + Send + Sync + 'static) -> Self {
        self.failure = Arc::new(callback);
        self
    }

    /// Sets the callback for session completion, replacing any previous one
    pub fn on_finished(mut self, callback: impl FnOnce(Vec<String>) + Send + 'static) -> Self {
        self.finished = Some(Box::new(callback));
        self
    }

    /// Restricts which URLs are dispatched, the seed included
    pub fn should_crawl(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.should_crawl = Some(Arc::new(filter));
        self
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("url", &self.url)
            .field("depth", &self.depth)
            .field("finished", &self.finished.is_some())
            .field("should_crawl", &self.should_crawl.is_some())
            .finish_non_exhaustive()
    }
}

/// Callbacks shared by every URL dispatched on behalf of one `crawl` call
struct PageHandlers {
    success: PageCallback,
    failure: PageCallback,
    should_crawl: Option<UrlFilter>,
}

impl PageHandlers {
    fn allows(&self, url: &str) -> bool {
        self.should_crawl.as_ref().map_or(true, |filter| filter(url))
    }
}

/// Everything guarded by the session lock
#[derive(Default)]
struct Session {
    state: CrawlState,
    executor: Option<Arc<dyn Executor>>,
    finished: Vec<FinishedCallback>,
}

impl Session {
    /// Takes what is needed to announce completion
    fn take_completion(&mut self) -> Completion {
        Completion {
            crawled_urls: self.state.crawled_urls().to_vec(),
            finished: std::mem::take(&mut self.finished),
            executor: self.executor.take(),
        }
    }
}

/// Completion work, performed after the session lock is released
struct Completion {
    crawled_urls: Vec<String>,
    finished: Vec<FinishedCallback>,
    executor: Option<Arc<dyn Executor>>,
}

impl Completion {
    fn announce(self) {
        tracing::info!("Crawl finished: {} URLs crawled", self.crawled_urls.len());

        for callback in self.finished {
            callback(self.crawled_urls.clone());
        }

        if let Some(executor) = self.executor {
            executor.stop();
        }
    }
}

struct CrawlerInner {
    session: Mutex<Session>,
    request_factory: Box<dyn RequestFactory>,
    executor_factory: Box<dyn ExecutorFactory>,
}

/// Recursive crawler owning a single crawl session
///
/// The first `crawl` call creates and starts the executor. Further calls made
/// before the session completes join it: they share dedup state and their
/// `finished` callbacks fire together. Once the session completes the crawler
/// refuses new work.
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<CrawlerInner>,
}

impl Crawler {
    /// Creates a crawler with explicit request and executor factories
    pub fn new(
        request_factory: impl RequestFactory + 'static,
        executor_factory: impl ExecutorFactory + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(CrawlerInner {
                session: Mutex::new(Session::default()),
                request_factory: Box::new(request_factory),
                executor_factory: Box::new(executor_factory),
            }),
        }
    }

    /// Creates a crawler fetching over HTTP with the configured executor
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn from_config(
        config: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, CrawlError> {
        let client = build_http_client(user_agent, config)?;
        Ok(Self::new(
            HttpRequestFactory::new(client),
            executor_factory(config.executor, config.max_concurrent_requests as usize),
        ))
    }

    /// Starts crawling from `options.url`
    ///
    /// Page outcomes arrive through the option callbacks; this returns as soon
    /// as the seed has been handed to the executor (or, with a synchronous
    /// executor, once the whole crawl is done).
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The seed was dispatched or skipped
    /// * `Err(CrawlError::SessionFinished)` - This crawler's session already completed
    /// * `Err(CrawlError::Executor)` - The executor could not be started or refused the seed
    pub fn crawl(&self, options: CrawlOptions) -> Result<(), CrawlError> {
        let CrawlOptions {
            url,
            depth,
            success,
            failure,
            finished,
            should_crawl,
        } = options;

        {
            let mut session = lock(&self.inner.session);
            if session.state.is_complete() {
                return Err(CrawlError::SessionFinished);
            }
            if session.executor.is_none() {
                let executor = self.inner.executor_factory.create_executor();
                executor.start()?;
                session.executor = Some(executor);
            }
            if let Some(finished) = finished {
                session.finished.push(finished);
            }
        }

        let url = self.inner.request_factory.canonical_url(&url);
        tracing::info!("Starting crawl of {} (depth {})", url, depth);

        let handlers = Arc::new(PageHandlers {
            success,
            failure,
            should_crawl,
        });
        let dispatched = self.inner.dispatch(&url, None, depth, &handlers)?;

        if !dispatched {
            let completion = {
                let mut session = lock(&self.inner.session);
                if session.state.complete_if_idle() {
                    Some(session.take_completion())
                } else {
                    None
                }
            };
            if let Some(completion) = completion {
                completion.announce();
            }
        }

        Ok(())
    }

    /// Crawls from `options.url` and waits for the session to complete
    ///
    /// Any `finished` callback in `options` still runs. Must be awaited inside a
    /// tokio runtime when the executor is tokio-backed.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Every crawled URL, in resolution order
    /// * `Err(CrawlError)` - The crawl could not start
    pub async fn run(&self, mut options: CrawlOptions) -> Result<Vec<String>, CrawlError> {
        let (sender, receiver) = oneshot::channel();
        let previous = options.finished.take();

        let options = options.on_finished(move |urls| {
            if let Some(previous) = previous {
                previous(urls.clone());
            }
            let _ = sender.send(urls);
        });

        self.crawl(options)?;
        receiver.await.map_err(|_| CrawlError::SessionAbandoned)
    }

    /// Copies the session's current progress
    pub fn state(&self) -> CrawlStateSnapshot {
        lock(&self.inner.session).state.snapshot()
    }

    /// Lifecycle position of a single URL
    pub fn page_state(&self, url: &str) -> PageState {
        lock(&self.inner.session).state.page_state(url)
    }
}

impl CrawlerInner {
    /// Dispatches one URL unless depth, the filter or dedup rule it out
    ///
    /// Returns true if a task was submitted.
    fn dispatch(
        self: &Arc<Self>,
        url: &str,
        referer: Option<&str>,
        depth: u32,
        handlers: &Arc<PageHandlers>,
    ) -> Result<bool, CrawlError> {
        if depth == 0 {
            tracing::debug!("Not crawling {}: depth exhausted", url);
            return Ok(false);
        }

        if !handlers.allows(url) {
            tracing::debug!("Not crawling {}: rejected by filter", url);
            return Ok(false);
        }

        let executor = {
            let mut session = lock(&self.session);
            if session.state.is_crawled(url) || session.state.is_visited(url) {
                tracing::trace!("Skipping {}: already {}", url, session.state.page_state(url));
                return Ok(false);
            }
            // The executor is taken when the session completes
            let executor = session
                .executor
                .clone()
                .ok_or(CrawlError::SessionFinished)?;
            session.state.mark_visited(url);
            session.state.mark_being_crawled(url)?;
            executor
        };

        tracing::debug!("Dispatching {} (depth {})", url, depth);

        let request = self.request_factory.create_request(referer, url);
        let task: Task = {
            let inner = Arc::clone(self);
            let handlers = Arc::clone(handlers);
            let url = url.to_string();
            let referer = referer.map(str::to_string);
            async move {
                let result = request.submit().await;
                inner.resolve(&url, referer.as_deref(), depth, &handlers, result);
            }
            .boxed()
        };

        if let Err(e) = executor.submit(task) {
            tracing::error!("Executor refused {}: {}", url, e);
            // Keep the in-flight list honest so the session can still complete
            self.settle(url);
            return Err(e.into());
        }

        Ok(true)
    }

    /// Handles a resolved request: callbacks, discovered links, then settlement
    fn resolve(
        self: &Arc<Self>,
        url: &str,
        referer: Option<&str>,
        depth: u32,
        handlers: &Arc<PageHandlers>,
        result: RequestResult,
    ) {
        match result {
            Ok(success) => {
                tracing::debug!(
                    "Fetched {} ({}, {} links)",
                    url,
                    success.response.status_code,
                    success.visited_urls.len()
                );

                let outcome = CrawlOutcome::success(url, referer, Arc::clone(&success.response));
                (handlers.success)(outcome);

                if success.last_visited_url != url {
                    tracing::debug!("{} redirected to {}", url, success.last_visited_url);
                    lock(&self.session)
                        .state
                        .mark_visited(&success.last_visited_url);
                }

                // Links go in flight before this URL settles, so the session
                // cannot be observed as empty in between
                if depth > 1 {
                    for link in &success.visited_urls {
                        if let Err(e) = self.dispatch(link, Some(url), depth - 1, handlers) {
                            tracing::error!("Failed to dispatch {} found on {}: {}", link, url, e);
                        }
                    }
                }
            }
            Err(failure) => {
                tracing::warn!("Failed to crawl {}: {}", url, failure.error);

                let outcome = CrawlOutcome::failure(url, referer, failure);
                (handlers.failure)(outcome);
            }
        }

        self.settle(url);
    }

    /// Marks `url` crawled and announces completion if nothing is left in flight
    fn settle(&self, url: &str) {
        let completion = {
            let mut session = lock(&self.session);
            match session.state.finished_crawling(url) {
                Ok(true) => Some(session.take_completion()),
                Ok(false) => None,
                Err(e) => {
                    tracing::error!("Crawl state violation: {}", e);
                    None
                }
            }
        };

        if let Some(completion) = completion {
            completion.announce();
        }
    }
}
