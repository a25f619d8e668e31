//! Feed connector configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// First reconnect delay after a dropped connection.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the reconnect delay, regardless of attempt count.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many automatic reconnects are attempted before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// How long a tenant switch waits before reconnecting, so rapid consecutive
/// switches collapse into one reconnect.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Feed connector configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base WebSocket URL of the activity feed (without the tenant query).
    pub feed_url: String,
    /// Whether dropped connections are reopened automatically.
    pub auto_reconnect: bool,
    /// Maximum automatic reconnect attempts before staying disconnected.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubles per attempt.
    pub initial_backoff: Duration,
    /// Cap applied to the doubled backoff delay.
    pub max_backoff: Duration,
    /// Delay between a tenant switch and the reconnect against the new
    /// tenant.
    pub settle_delay: Duration,
}

impl FeedConfig {
    /// Create a configuration for the given feed URL with default policy.
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            auto_reconnect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Enable or disable automatic reconnection.
    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the maximum automatic reconnect attempts.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the initial backoff delay.
    #[must_use]
    pub const fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Set the backoff cap.
    #[must_use]
    pub const fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Set the tenant-switch settle delay.
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the URL is empty or the backoff bounds
    /// are zero or inverted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_url.is_empty() {
            return Err(ConfigError::EmptyFeedUrl);
        }
        if self.initial_backoff.is_zero() {
            return Err(ConfigError::ZeroBackoff);
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ConfigError::BackoffBoundsInverted {
                initial: self.initial_backoff,
                max: self.max_backoff,
            });
        }
        Ok(())
    }

    /// Backoff delay for the given attempt number (0-based), doubling per
    /// attempt and capped at `max_backoff`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // Saturate the shift; 2^attempt overflows u32 long before the cap
        // matters for any realistic attempt count.
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}
