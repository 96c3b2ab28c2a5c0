//! Crawler module for crawl orchestration and its collaborators
//!
//! This module contains:
//! - The `Crawler` orchestrator and its per-call `CrawlOptions`
//! - The `Request` contract and the reqwest-backed `HttpRequest`
//! - The `Executor` contract and the immediate, pooled and queued executors
//! - HTML link extraction used by `HttpRequest`

mod coordinator;
mod executor;
mod fetcher;
mod outcome;
mod parser;
mod request;
mod response;

pub use coordinator::{
    CrawlOptions, Crawler, FinishedCallback, PageCallback, UrlFilter, DEFAULT_DEPTH,
};
pub use executor::{
    executor_factory, Executor, ExecutorError, ExecutorFactory, ImmediateExecutor,
    PooledExecutor, QueuedExecutor, Task,
};
pub use fetcher::{build_http_client, HttpRequest, HttpRequestFactory};
pub use outcome::CrawlOutcome;
pub use parser::extract_links;
pub use request::{
    Request, RequestError, RequestFactory, RequestFailure, RequestFuture, RequestResult,
    RequestSuccess,
};
pub use response::{decode_body, HttpResponse};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a callback panicked while it was held
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
