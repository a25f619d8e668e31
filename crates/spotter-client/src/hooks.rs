//! Application callback surface.

use spotter_proto::ActivityEvent;

/// Callbacks invoked by the feed driver as the connection changes state and
/// events arrive.
///
/// All methods default to no-ops so implementors only override the slots
/// they care about. Called from the driver task, so implementations should
/// hand work off rather than block.
pub trait FeedHooks: Send + 'static {
    /// The feed connected (or reconnected).
    fn on_connect(&mut self) {}

    /// A domain event arrived.
    fn on_activity(&mut self, event: ActivityEvent) {
        let _ = event;
    }

    /// The transport failed or no tenant was available.
    fn on_error(&mut self, reason: &str) {
        let _ = reason;
    }

    /// The feed disconnected.
    fn on_disconnect(&mut self) {}
}
