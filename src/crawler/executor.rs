//! Executors: where and when crawl tasks run
//!
//! The crawler hands every fetch to an `Executor` as a boxed future and makes no
//! assumption about whether `submit` runs it before returning or later. Three
//! policies are provided:
//!
//! - `ImmediateExecutor`: runs tasks on the submitting thread; tasks submitted
//!   while a task is running are queued and run right after it
//! - `PooledExecutor`: spawns tasks on the tokio runtime, at most
//!   `max_concurrent` of them running at once
//! - `QueuedExecutor`: one tokio worker running tasks one by one in submission order

use crate::config::ExecutorKind;
use crate::crawler::lock;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};

/// A unit of crawl work
pub type Task = BoxFuture<'static, ()>;

/// Executor misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("Executor has not been started")]
    NotStarted,

    #[error("Executor has been stopped")]
    Stopped,

    #[error("Executor requires a running tokio runtime")]
    NoRuntime,
}

/// Runs submitted tasks according to its own concurrency policy
pub trait Executor: Send + Sync {
    /// Prepares the executor; must be called before the first `submit`
    fn start(&self) -> Result<(), ExecutorError>;

    /// Hands a task over; it may run before this returns or later
    fn submit(&self, task: Task) -> Result<(), ExecutorError>;

    /// Refuses further tasks
    fn stop(&self);
}

/// Creates the executor for a crawl session
///
/// Closures returning `Arc<dyn Executor>` implement this trait.
pub trait ExecutorFactory: Send + Sync {
    fn create_executor(&self) -> Arc<dyn Executor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn() -> Arc<dyn Executor> + Send + Sync,
{
    fn create_executor(&self) -> Arc<dyn Executor> {
        self()
    }
}

/// Builds the factory for a configured executor kind
pub fn executor_factory(kind: ExecutorKind, max_concurrent: usize) -> impl ExecutorFactory {
    move || -> Arc<dyn Executor> {
        match kind {
            ExecutorKind::Pooled => Arc::new(PooledExecutor::new(max_concurrent)),
            ExecutorKind::Queued => Arc::new(QueuedExecutor::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Lifecycle {
    #[default]
    Created,
    Running,
    Stopped,
}

impl Lifecycle {
    fn ensure_running(self) -> Result<(), ExecutorError> {
        match self {
            Self::Created => Err(ExecutorError::NotStarted),
            Self::Running => Ok(()),
            Self::Stopped => Err(ExecutorError::Stopped),
        }
    }
}

/// Runs tasks to completion on the thread that submits them
///
/// Nested submissions are trampolined through a queue, so a task that submits
/// more work never recurses into the executor. Tasks are driven with
/// `futures::executor::block_on`; requests that depend on a tokio reactor
/// should use one of the tokio-backed executors instead.
#[derive(Default)]
pub struct ImmediateExecutor {
    inner: Mutex<ImmediateInner>,
}

#[derive(Default)]
struct ImmediateInner {
    status: Lifecycle,
    queue: VecDeque<Task>,
    draining: bool,
}

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for ImmediateExecutor {
    fn start(&self) -> Result<(), ExecutorError> {
        let mut inner = lock(&self.inner);
        if inner.status == Lifecycle::Stopped {
            return Err(ExecutorError::Stopped);
        }
        inner.status = Lifecycle::Running;
        Ok(())
    }

    fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        {
            let mut inner = lock(&self.inner);
            inner.status.ensure_running()?;
            inner.queue.push_back(task);
            if inner.draining {
                return Ok(());
            }
            inner.draining = true;
        }

        loop {
            let next = {
                let mut inner = lock(&self.inner);
                match inner.queue.pop_front() {
                    Some(task) => task,
                    None => {
                        inner.draining = false;
                        break;
                    }
                }
            };
            futures::executor::block_on(next);
        }

        Ok(())
    }

    fn stop(&self) {
        lock(&self.inner).status = Lifecycle::Stopped;
    }
}

/// Spawns tasks on the tokio runtime with bounded concurrency
///
/// Every task waits for a semaphore permit before it starts, so at most
/// `max_concurrent` tasks run at once. `start` captures the runtime handle of
/// the calling context.
pub struct PooledExecutor {
    semaphore: Arc<Semaphore>,
    inner: Mutex<PooledInner>,
}

#[derive(Default)]
struct PooledInner {
    status: Lifecycle,
    handle: Option<Handle>,
}

impl PooledExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            inner: Mutex::new(PooledInner::default()),
        }
    }
}

impl Executor for PooledExecutor {
    fn start(&self) -> Result<(), ExecutorError> {
        let mut inner = lock(&self.inner);
        match inner.status {
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => return Err(ExecutorError::Stopped),
            Lifecycle::Created => {}
        }
        let handle = Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;
        inner.handle = Some(handle);
        inner.status = Lifecycle::Running;
        Ok(())
    }

    fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        let handle = {
            let inner = lock(&self.inner);
            inner.status.ensure_running()?;
            inner.handle.clone().ok_or(ExecutorError::NotStarted)?
        };

        let semaphore = Arc::clone(&self.semaphore);
        handle.spawn(async move {
            // The semaphore is never closed, so acquiring only waits
            let _permit = semaphore.acquire_owned().await.ok();
            task.await;
        });

        Ok(())
    }

    fn stop(&self) {
        let mut inner = lock(&self.inner);
        inner.status = Lifecycle::Stopped;
        inner.handle = None;
    }
}

/// Runs tasks sequentially, in submission order, on a single tokio worker
#[derive(Default)]
pub struct QueuedExecutor {
    inner: Mutex<QueuedInner>,
}

#[derive(Default)]
struct QueuedInner {
    status: Lifecycle,
    sender: Option<mpsc::UnboundedSender<Task>>,
}

impl QueuedExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for QueuedExecutor {
    fn start(&self) -> Result<(), ExecutorError> {
        let mut inner = lock(&self.inner);
        match inner.status {
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => return Err(ExecutorError::Stopped),
            Lifecycle::Created => {}
        }
        let handle = Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        handle.spawn(async move {
            while let Some(task) = receiver.recv().await {
                task.await;
            }
            tracing::trace!("Queued executor worker exiting");
        });

        inner.sender = Some(sender);
        inner.status = Lifecycle::Running;
        Ok(())
    }

    fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        let inner = lock(&self.inner);
        inner.status.ensure_running()?;
        inner
            .sender
            .as_ref()
            .ok_or(ExecutorError::NotStarted)?
            .send(task)
            .map_err(|_| ExecutorError::Stopped)
    }

    fn stop(&self) {
        let mut inner = lock(&self.inner);
        inner.status = Lifecycle::Stopped;
        // Dropping the sender lets the worker exit once the queue is drained
        inner.sender = None;
    }
}
