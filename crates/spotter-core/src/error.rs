//! Error types for the core components.
//!
//! Expected failure modes (network drops, malformed envelopes, absent tenant
//! context) never surface as `Err` from this crate: they are state
//! transitions and log lines, in line with how the connector is consumed by
//! UI code. Only configuration mistakes (programming errors) propagate as
//! results.

use std::time::Duration;

use thiserror::Error;

/// Errors from validating a [`FeedConfig`](crate::FeedConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The feed URL is empty.
    #[error("feed URL must not be empty")]
    EmptyFeedUrl,

    /// The backoff bounds are inverted.
    #[error("max backoff {max:?} is below initial backoff {initial:?}")]
    BackoffBoundsInverted {
        /// Configured initial backoff.
        initial: Duration,
        /// Configured maximum backoff.
        max: Duration,
    },

    /// A zero backoff would busy-loop the reconnect path.
    #[error("initial backoff must be non-zero")]
    ZeroBackoff,
}
