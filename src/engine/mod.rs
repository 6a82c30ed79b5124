//! # Shuffle Engine
//!
//! The concurrent, rate-limit aware plumbing every shuffle run goes through:
//!
//! ```text
//! Sources / Orchestrator
//!          ↓
//!   Remote (client + retry policy + fan-out limits)
//!     ├── retry      - waits out 429s, up to MAX_ATTEMPTS per call
//!     ├── pagination - offset fan-out and sequential cursor walks
//!     ├── aggregate  - shared deduplicating track set
//!     └── writer     - clear + chunked append to the target playlist
//!          ↓
//!   Catalog (Spotify Web API or a test double)
//! ```
//!
//! Every remote call made by the engine, the sources and the orchestrator is
//! issued through [`Remote::call`], which routes it through the
//! [`RetryPolicy`].

pub mod aggregate;
pub mod pagination;
pub mod retry;
pub mod writer;

use std::{future::Future, sync::Arc};

pub use aggregate::AggregationSet;
pub use pagination::{FetchOptions, PageFailurePolicy};
pub use retry::RetryPolicy;
pub use writer::BatchWriter;

use crate::{error::RemoteError, spotify::Catalog};

/// Handle to the remote catalog shared by every task of a run.
///
/// Cloning is cheap; spawned fan-out tasks each take their own clone.
#[derive(Clone)]
pub struct Remote {
    client: Arc<dyn Catalog>,
    retry: RetryPolicy,
    fetch: FetchOptions,
}

impl Remote {
    pub fn new(client: Arc<dyn Catalog>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            fetch: FetchOptions::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn client(&self) -> &dyn Catalog {
        self.client.as_ref()
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch
    }

    /// Runs one remote operation through the retry policy.
    ///
    /// `call` is invoked once per attempt and receives the client.
    pub async fn call<'a, T, F, Fut>(&'a self, operation: &str, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut(&'a dyn Catalog) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let client = self.client.as_ref();
        self.retry.execute(operation, || call(client)).await
    }
}
