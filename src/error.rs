//! Error types for the shuffle engine and its collaborators.
//!
//! The split mirrors how far a failure is allowed to travel:
//!
//! - [`RemoteError`] comes out of a single remote call. `RateLimited` never
//!   leaves the retry executor unless attempts run out, in which case it is
//!   wrapped in `RetryExhausted`.
//! - [`PreferenceError`] is a read/write failure of the triage file.
//! - [`SourceError`] aborts one source's contribution only.
//! - [`RunError`] stops the whole run.

use std::{io, time::Duration};

use thiserror::Error;

/// Failure of one call against the remote catalog.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered 429 and asked us to wait.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Non-success status other than 429.
    #[error("{operation} failed with status {status}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// No usable access token. Run `shufflecli auth`.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// A fan-out task panicked or was cancelled before producing a result.
    #[error("background task failed")]
    TaskFailed,

    /// Rate limited on every attempt.
    #[error("{operation} still rate limited after {attempts} attempts: {last}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last: Box<RemoteError>,
    },
}

impl RemoteError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }
}

/// Failure to read or write the triage preference file.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference file i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("preference file {path} is malformed: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure that aborts a single source's contribution to the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    #[error("operator prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

/// Failure that stops the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not load current members of the shuffle playlist: {0}")]
    Baseline(#[source] RemoteError),

    /// Write-back failed. The target playlist may be partially populated;
    /// re-running rebuilds it from scratch.
    #[error("writing the shuffle playlist failed after {written} of {total} tracks: {source}")]
    Write {
        written: usize,
        total: usize,
        #[source]
        source: RemoteError,
    },
}
