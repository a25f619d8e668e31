//! Activity feed connector state machine.
//!
//! Maintains a live event stream from the backend for one tenant, survives
//! transient disconnects via bounded exponential backoff, and delivers parsed
//! events to a subscriber without ever duplicating connections. Uses the
//! action pattern: methods take time as input and return actions for the
//! driver to execute, which keeps the state machine pure (no I/O) and makes
//! testing straightforward.
//!
//! # State Machine
//!
//! ```text
//!             Connect            Opened
//! ┌──────────────┐ ┌────────────┐ ┌───────────┐
//! │ Disconnected │>│ Connecting │>│ Connected │
//! └──────────────┘ └────────────┘ └───────────┘
//!        ^                │              │ TransportError
//!        │ Closed         │              ↓
//!        │ (schedules     │         ┌───────┐
//!        │  reconnect)    └────────>│ Error │
//!        └──────────────────────────└───────┘
//! ```
//!
//! All four transitions out of `Connected`/`Error` funnel through the
//! `Closed` event, which is where reconnection is scheduled.

use std::{ops::Sub, time::Duration};

use spotter_proto::{ActivityEvent, Envelope, TenantId};

use crate::{config::FeedConfig, error::ConfigError};

/// Connection status of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// No connection and none in progress. Initial and terminal state.
    Disconnected,
    /// An open has been issued; waiting for the transport to report it.
    Connecting,
    /// The stream is live.
    Connected,
    /// The transport reported a failure, or no tenant was available. The
    /// close event that follows a transport failure drives reconnection.
    Error,
}

/// Events the driver feeds into the connector.
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and manual clocks in tests.
#[derive(Debug, Clone)]
pub enum FeedEvent<I = std::time::Instant> {
    /// Application wants the feed open.
    Connect,

    /// Application wants the feed closed; cancels any pending reconnect.
    Disconnect,

    /// The transport reports the connection is open.
    Opened,

    /// A text frame arrived on the stream.
    MessageReceived {
        /// Raw frame text, expected to be a JSON envelope.
        text: String,
    },

    /// The transport reports a failure. The transport's own close follows.
    TransportError {
        /// Human-readable failure description.
        reason: String,
    },

    /// The connection closed, regardless of cause.
    Closed {
        /// Current time, used to schedule the reconnect deadline.
        now: I,
    },

    /// Periodic tick for deadline processing.
    ///
    /// The driver should send ticks at a granularity finer than the
    /// configured backoff so reconnects fire close to their deadline.
    Tick {
        /// Current time from the driver's clock.
        now: I,
    },

    /// The externally-observed tenant selection changed.
    TenantChanged {
        /// New tenant, or `None` when the user has no gym selected.
        tenant: Option<TenantId>,
        /// Current time, used to arm the settle deadline.
        now: I,
    },
}

/// Subscriber notifications, one per callback slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedNotification {
    /// The stream opened.
    Connected,
    /// A domain event arrived.
    Activity(ActivityEvent),
    /// The transport failed or no tenant was available.
    Error {
        /// Failure description.
        reason: String,
    },
    /// The stream closed.
    Disconnected,
}

/// Actions the connector produces for the driver to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedAction {
    /// Open a connection to this URL.
    Open {
        /// Fully tenant-scoped feed URL.
        url: String,
    },

    /// Close the live connection if one exists. No-op otherwise.
    Close,

    /// Deliver a notification to the subscriber.
    Notify(FeedNotification),
}

/// A single pending deadline: armed at `scheduled_at`, fires after `delay`.
#[derive(Debug, Clone, Copy)]
struct Deadline<I> {
    scheduled_at: I,
    delay: Duration,
}

impl<I> Deadline<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn elapsed(&self, now: I) -> bool {
        now >= self.scheduled_at && now - self.scheduled_at >= self.delay
    }
}

/// Feed connector state machine.
///
/// One instance maintains at most one logical connection. `Connect` while
/// already connecting or connected is a safe no-op, and at most one reconnect
/// deadline is pending at a time (it is a single field), so duplicate sockets
/// cannot be requested.
///
/// This is a pure state machine: no I/O, no clock reads. Time is passed as a
/// parameter on the events that need it and must be monotonic.
#[derive(Debug, Clone)]
pub struct FeedConnector<I = std::time::Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Configuration, validated at construction.
    config: FeedConfig,
    /// Current status.
    status: FeedStatus,
    /// Tenant the connection is scoped to.
    tenant: Option<TenantId>,
    /// Reconnects scheduled since the last successful open.
    reconnect_attempts: u32,
    /// Last successfully parsed domain event.
    last_event: Option<ActivityEvent>,
    /// Pending reconnect deadline, if any.
    reconnect_due: Option<Deadline<I>>,
    /// Pending tenant-switch settle deadline, if any.
    settle_due: Option<Deadline<I>>,
    /// False after an explicit `Disconnect`, so the close that follows a
    /// manual teardown schedules nothing.
    reconnect_armed: bool,
}

impl<I> FeedConnector<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a connector for the given tenant.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new(config: FeedConfig, tenant: Option<TenantId>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            status: FeedStatus::Disconnected,
            tenant,
            reconnect_attempts: 0,
            last_event: None,
            reconnect_due: None,
            settle_due: None,
            reconnect_armed: false,
        })
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        self.status
    }

    /// Last successfully parsed domain event. `None` until one arrives.
    #[must_use]
    pub fn last_event(&self) -> Option<&ActivityEvent> {
        self.last_event.as_ref()
    }

    /// Reconnects scheduled since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Tenant the connector is currently scoped to.
    #[must_use]
    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// Delay of the pending reconnect deadline, if one is armed.
    #[must_use]
    pub fn scheduled_backoff(&self) -> Option<Duration> {
        self.reconnect_due.as_ref().map(|deadline| deadline.delay)
    }

    /// Whether a tenant-switch settle deadline is pending.
    #[must_use]
    pub fn settle_pending(&self) -> bool {
        self.settle_due.is_some()
    }

    /// Process an event and return actions for the driver to execute.
    pub fn handle(&mut self, event: FeedEvent<I>) -> Vec<FeedAction> {
        match event {
            FeedEvent::Connect => self.start_connect(),
            FeedEvent::Disconnect => self.handle_disconnect(),
            FeedEvent::Opened => self.handle_opened(),
            FeedEvent::MessageReceived { text } => self.handle_message(&text),
            FeedEvent::TransportError { reason } => self.handle_transport_error(reason),
            FeedEvent::Closed { now } => self.handle_closed(now),
            FeedEvent::Tick { now } => self.handle_tick(now),
            FeedEvent::TenantChanged { tenant, now } => self.handle_tenant_changed(tenant, now),
        }
    }

    /// Begin a connection attempt against the current tenant.
    ///
    /// No-op while connecting or connected; this is what prevents duplicate
    /// sockets. A manual connect also cancels any pending reconnect deadline
    /// so an elapsed deadline cannot double-open later.
    fn start_connect(&mut self) -> Vec<FeedAction> {
        if matches!(self.status, FeedStatus::Connecting | FeedStatus::Connected) {
            tracing::debug!(status = ?self.status, "connect ignored; connection already active");
            return Vec::new();
        }

        self.reconnect_due = None;

        let Some(tenant) = self.tenant.clone() else {
            tracing::warn!("cannot connect to activity feed: no tenant selected");
            self.status = FeedStatus::Error;
            return vec![FeedAction::Notify(FeedNotification::Error {
                reason: "no tenant selected".to_string(),
            })];
        };

        self.status = FeedStatus::Connecting;
        self.reconnect_armed = true;

        let url = self.feed_url(&tenant);
        tracing::info!(%tenant, "opening activity feed");

        // Close first: a half-dead socket may survive an Error state.
        vec![FeedAction::Close, FeedAction::Open { url }]
    }

    fn handle_opened(&mut self) -> Vec<FeedAction> {
        self.status = FeedStatus::Connected;
        self.reconnect_attempts = 0;
        self.reconnect_due = None;

        tracing::info!("activity feed connected");
        vec![FeedAction::Notify(FeedNotification::Connected)]
    }

    fn handle_message(&mut self, text: &str) -> Vec<FeedAction> {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                // Non-fatal: the connection stays open.
                tracing::warn!(%error, "discarding malformed feed envelope");
                return Vec::new();
            },
        };

        match envelope {
            Envelope::Connection { message } => {
                tracing::info!(message = message.as_deref().unwrap_or(""), "feed greeting");
                Vec::new()
            },
            Envelope::Activity { data: Some(event) } => {
                self.last_event = Some(event.clone());
                vec![FeedAction::Notify(FeedNotification::Activity(event))]
            },
            Envelope::Activity { data: None } => {
                tracing::debug!("activity envelope without payload ignored");
                Vec::new()
            },
            Envelope::Unknown => {
                tracing::debug!("ignoring unrecognized envelope kind");
                Vec::new()
            },
        }
    }

    fn handle_transport_error(&mut self, reason: String) -> Vec<FeedAction> {
        tracing::warn!(%reason, "activity feed transport error");
        self.status = FeedStatus::Error;

        // No Close here: the transport's own close event follows and drives
        // reconnection.
        vec![FeedAction::Notify(FeedNotification::Error { reason })]
    }

    fn handle_closed(&mut self, now: I) -> Vec<FeedAction> {
        if self.status == FeedStatus::Disconnected {
            // Close after an explicit Disconnect (or a duplicate close
            // report): already handled.
            return Vec::new();
        }

        self.status = FeedStatus::Disconnected;
        let actions = vec![FeedAction::Notify(FeedNotification::Disconnected)];

        if self.reconnect_armed
            && self.config.auto_reconnect
            && self.reconnect_attempts < self.config.max_reconnect_attempts
        {
            let delay = self.config.backoff_delay(self.reconnect_attempts);
            self.reconnect_due = Some(Deadline { scheduled_at: now, delay });
            self.reconnect_attempts += 1;
            tracing::info!(
                attempt = self.reconnect_attempts,
                delay_ms = delay.as_millis() as u64,
                "scheduling feed reconnect"
            );
        } else if self.reconnect_armed && self.config.auto_reconnect {
            tracing::warn!(
                attempts = self.reconnect_attempts,
                "feed reconnect attempts exhausted; staying disconnected"
            );
        }

        actions
    }

    fn handle_tick(&mut self, now: I) -> Vec<FeedAction> {
        if let Some(deadline) = self.settle_due
            && deadline.elapsed(now)
        {
            self.settle_due = None;
            return self.start_connect();
        }

        if let Some(deadline) = self.reconnect_due
            && deadline.elapsed(now)
        {
            self.reconnect_due = None;
            tracing::info!(attempt = self.reconnect_attempts, "feed reconnect deadline elapsed");
            return self.start_connect();
        }

        Vec::new()
    }

    fn handle_disconnect(&mut self) -> Vec<FeedAction> {
        self.reconnect_armed = false;
        self.reconnect_due = None;
        self.settle_due = None;
        self.reconnect_attempts = 0;

        let was_active = self.status != FeedStatus::Disconnected;
        self.status = FeedStatus::Disconnected;

        let mut actions = vec![FeedAction::Close];
        if was_active {
            actions.push(FeedAction::Notify(FeedNotification::Disconnected));
        }
        actions
    }

    fn handle_tenant_changed(&mut self, tenant: Option<TenantId>, now: I) -> Vec<FeedAction> {
        if tenant == self.tenant {
            return Vec::new();
        }

        tracing::info!(
            from = self.tenant.as_ref().map_or("<none>", TenantId::as_str),
            to = tenant.as_ref().map_or("<none>", TenantId::as_str),
            "tenant changed"
        );

        self.tenant = tenant;
        self.reconnect_due = None;
        self.settle_due = None;
        self.reconnect_attempts = 0;

        let was_active = matches!(self.status, FeedStatus::Connecting | FeedStatus::Connected);
        self.status = FeedStatus::Disconnected;

        let mut actions = Vec::new();
        if was_active {
            actions.push(FeedAction::Close);
            actions.push(FeedAction::Notify(FeedNotification::Disconnected));
        }

        // Reconnect against the new tenant after a short settle delay, so
        // rapid consecutive switches collapse into one reconnect.
        if self.tenant.is_some() {
            self.settle_due =
                Some(Deadline { scheduled_at: now, delay: self.config.settle_delay });
        } else {
            self.reconnect_armed = false;
        }

        actions
    }

    /// Tenant-scoped feed URL.
    fn feed_url(&self, tenant: &TenantId) -> String {
        let separator = if self.config.feed_url.contains('?') { '&' } else { '?' };
        format!("{}{}gym_id={}", self.config.feed_url, separator, tenant)
    }
}
