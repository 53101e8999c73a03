//! # Flapjack Transport
//!
//! Retrying transport core of the Flapjack search SDK. It turns one logical
//! API call into one or more HTTP attempts against a set of candidate
//! hosts, with retry, failover, and health tracking, plus the polling
//! protocol that waits for server-side write tasks to be published.
//!
//! ## Features
//!
//! - Ordered host list with per-host call-type acceptance and priorities
//! - Health tracking with a fixed per-host cooldown and optimistic retry
//! - Per-attempt connect/read/write timeouts with per-call overrides
//! - Fatal vs transient classification: 4xx never retried, 5xx and
//!   connection failures retried across the remaining hosts
//! - `wait_for_task` polling with a fixed interval and bounded wall-clock
//!   budget
//!
//! ## Example
//!
//! ```ignore
//! use flapjack_transport::{CallType, Configuration, Host, RequestOptions, Transporter};
//!
//! let config = Configuration::new(
//!     "MY_APP",
//!     "my-api-key",
//!     vec![
//!         Host::read_write("my-app.flapjack.net"),
//!         Host::read_write("my-app-1.flapjack.net").with_priority(1),
//!     ],
//! );
//! let transporter = Transporter::new(config)?;
//!
//! let results: serde_json::Value = transporter
//!     .request(
//!         reqwest::Method::POST,
//!         "/indexes/products/query",
//!         Some(&serde_json::json!({ "query": "pancake" })),
//!         CallType::READ,
//!         &RequestOptions::new(),
//!     )
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod call;
pub mod config;
pub mod host;
pub mod task;
pub mod transporter;

mod retry;

pub use call::CallType;
pub use config::Configuration;
pub use host::{Host, HostRegistry, HostStats};
pub use transporter::{RequestOptions, Transporter};

// Error types live in their own crate, shared across the SDK.
pub use flapjack_error::{Error, HostFailure, Result};
