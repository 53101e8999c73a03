//! # Flapjack Error
//!
//! This crate provides the unified error types for the Flapjack search SDK.
//! It consolidates everything the transport layer can surface to a caller
//! into a single error hierarchy.
//!
//! ## Error Categories
//!
//! - Configuration errors — raised before any network call, never retried
//! - Fatal request errors — 4xx responses and undecodable bodies
//! - Exhausted retries — every candidate host failed with a transient error
//! - Ambiguous writes — a write timed out after the request may have been
//!   applied server-side
//! - Task timeouts — a write task was not published within the wait budget
//!
//! ## Example
//!
//! ```
//! use flapjack_error::{Error, Result};
//!
//! fn require_app_id(app_id: &str) -> Result<()> {
//!     if app_id.is_empty() {
//!         return Err(Error::Configuration("application id is empty".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;
use thiserror::Error;

/// One host's transient failure, collected while retrying across hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    /// Host address (`host[:port]`) that was attempted.
    pub host: String,
    /// Why the attempt failed.
    pub reason: String,
}

impl std::fmt::Display for HostFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.host, self.reason)
    }
}

fn join_failures(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(HostFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The error type surfaced by the Flapjack transport layer.
#[derive(Error, Debug)]
pub enum Error {
    /// The client configuration is unusable: invalid host URL, empty
    /// credentials, or no configured host accepts the requested call type.
    /// Raised synchronously, before any network I/O.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The service rejected the request (4xx) or returned a body that could
    /// not be decoded. Retrying against another host would repeat the same
    /// client mistake, so exactly one attempt is made.
    #[error("request failed with status {status}: {body}")]
    RequestFailed {
        /// HTTP status code of the failing response.
        status: u16,
        /// Raw response body, for diagnosis without server access.
        body: String,
    },

    /// Every eligible host failed with a transient error. Carries one entry
    /// per attempted host.
    #[error("all hosts failed: {}", join_failures(.0))]
    AllHostsFailed(Vec<HostFailure>),

    /// A non-idempotent write timed out after the request started; the
    /// server may or may not have applied it, so it is not retried.
    #[error("write to {host} timed out and may have been applied server-side")]
    AmbiguousWrite {
        /// Host address the write was sent to.
        host: String,
    },

    /// A write task was still unpublished when the wait budget ran out.
    /// The write itself may have succeeded server-side; callers can re-poll
    /// with a longer budget.
    #[error("task {task_id} on index '{index}' not published after {elapsed:?}")]
    TaskTimeout {
        /// Index the task belongs to.
        index: String,
        /// Identifier of the unresolved task.
        task_id: u64,
        /// Wall-clock time spent polling.
        elapsed: Duration,
    },

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
