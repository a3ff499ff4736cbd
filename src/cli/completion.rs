//! Memoised termination results.
//!
//! A [`Completion`] wraps the future that decides how a run ended. The future
//! is driven at most once; every clone and every call to [`Completion::wait`]
//! observes the same cached [`Result`].

use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Cloneable, idempotent handle to a deferred `Result<()>`.
#[derive(Clone)]
pub struct Completion {
    inner: Shared<BoxFuture<'static, Result<()>>>,
}

impl Completion {
    /// Memoise an arbitrary future.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Memoise the outcome of a spawned task.
    ///
    /// A panicked or aborted task resolves to [`Error::TaskFailed`].
    #[must_use]
    pub fn from_task(handle: JoinHandle<Result<()>>) -> Self {
        Self::from_future(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::TaskFailed(e.to_string())),
            }
        })
    }

    /// An already-resolved completion.
    #[must_use]
    pub fn ready(result: Result<()>) -> Self {
        Self::from_future(futures_util::future::ready(result))
    }

    /// Wait for the outcome. Safe to call from any number of tasks.
    ///
    /// # Errors
    ///
    /// Returns the error the underlying future resolved to.
    pub async fn wait(&self) -> Result<()> {
        self.inner.clone().await
    }

    /// The outcome, if it has already been computed.
    #[must_use]
    pub fn peek(&self) -> Option<Result<()>> {
        self.inner.peek().cloned()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.inner.peek().is_some())
            .finish()
    }
}
