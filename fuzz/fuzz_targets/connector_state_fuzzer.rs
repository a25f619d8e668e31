//! Fuzz target for the FeedConnector state machine
//!
//! Drives the connector with arbitrary event sequences and checks its core
//! invariants after every transition.
//!
//! # Invariants
//!
//! - Never panics, for any event in any state
//! - Reconnect attempts never exceed the configured cap
//! - A scheduled backoff never exceeds the configured ceiling
//! - A single transition never requests more than one `Open`

#![no_main]

use std::{ops::Sub, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spotter_core::{FeedAction, FeedConfig, FeedConnector, FeedEvent, TenantId};

/// Manual clock: milliseconds since an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FuzzInstant(u64);

impl Sub for FuzzInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0 - rhs.0)
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Connect,
    Disconnect,
    Opened,
    Message(String),
    TransportError,
    Closed,
    Tick { advance_ms: u16 },
    TenantChanged(Option<u8>),
}

fuzz_target!(|input: (Option<u8>, Vec<FuzzEvent>)| {
    let (tenant, events) = input;
    let config = FeedConfig::new("wss://api.example/ws/activity");
    let max_attempts = 5;
    let max_backoff = Duration::from_secs(30);

    let Ok(mut conn) = FeedConnector::<FuzzInstant>::new(
        config,
        tenant.map(|id| TenantId::new(id.to_string())),
    ) else {
        return;
    };

    let mut now = FuzzInstant(0);

    for event in events {
        let event = match event {
            FuzzEvent::Connect => FeedEvent::Connect,
            FuzzEvent::Disconnect => FeedEvent::Disconnect,
            FuzzEvent::Opened => FeedEvent::Opened,
            FuzzEvent::Message(text) => FeedEvent::MessageReceived { text },
            FuzzEvent::TransportError => {
                FeedEvent::TransportError { reason: "fuzzed failure".to_string() }
            }
            FuzzEvent::Closed => FeedEvent::Closed { now },
            FuzzEvent::Tick { advance_ms } => {
                now = FuzzInstant(now.0 + u64::from(advance_ms));
                FeedEvent::Tick { now }
            }
            FuzzEvent::TenantChanged(id) => FeedEvent::TenantChanged {
                tenant: id.map(|id| TenantId::new(id.to_string())),
                now,
            },
        };

        let actions = conn.handle(event);

        let opens = actions
            .iter()
            .filter(|action| matches!(action, FeedAction::Open { .. }))
            .count();
        assert!(opens <= 1, "single transition requested {opens} opens");

        assert!(
            conn.reconnect_attempts() <= max_attempts,
            "attempts {} exceed the cap",
            conn.reconnect_attempts()
        );

        if let Some(delay) = conn.scheduled_backoff() {
            assert!(delay <= max_backoff, "backoff {delay:?} exceeds the ceiling");
        }
    }
});
