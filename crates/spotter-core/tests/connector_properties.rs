//! Property-based tests for the feed connector.
//!
//! Drives the state machine with arbitrary stimulus sequences through a
//! simulated transport and verifies the invariants that must hold for ALL
//! interleavings, not just the scripted scenarios in the unit tests.

use std::time::Duration;

use proptest::prelude::*;
use spotter_core::{FeedAction, FeedConfig, FeedConnector, FeedEvent, FeedStatus, TenantId};

/// Manual clock: milliseconds since an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TestInstant(u64);

impl std::ops::Sub for TestInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0 - rhs.0)
    }
}

/// One external stimulus applied to the connector via the simulated driver.
#[derive(Debug, Clone)]
enum Stimulus {
    /// The user asks for the feed to open. The attempt outcome is decided by
    /// the simulated transport.
    Connect { succeeds: bool },
    /// The user asks for the feed to close.
    Disconnect,
    /// The selected gym changes (or is cleared).
    TenantSwitch(Option<u8>),
    /// A text frame arrives, if a connection is live.
    Frame(String),
    /// The live connection drops: transport error followed by close.
    Drop,
    /// Time advances in ticks of the given size. Reconnects triggered by an
    /// elapsed deadline succeed or fail per the transport flag.
    Advance { ticks: u8, tick_ms: u16, succeeds: bool },
}

fn arbitrary_frame() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(r#"{"type":"connection","message":"hi"}"#.to_string()),
        Just(r#"{"type":"activity","data":{"id":7,"kind":"checkin"}}"#.to_string()),
        Just(r#"{"type":"activity"}"#.to_string()),
        Just(r#"{"type":"billing","amount":5}"#.to_string()),
        Just("{not valid".to_string()),
        ".{0,64}",
    ]
}

fn arbitrary_stimulus() -> impl Strategy<Value = Stimulus> {
    prop_oneof![
        any::<bool>().prop_map(|succeeds| Stimulus::Connect { succeeds }),
        Just(Stimulus::Disconnect),
        proptest::option::of(0u8..4).prop_map(Stimulus::TenantSwitch),
        arbitrary_frame().prop_map(Stimulus::Frame),
        Just(Stimulus::Drop),
        (1u8..8, 100u16..2000, any::<bool>()).prop_map(|(ticks, tick_ms, succeeds)| {
            Stimulus::Advance { ticks, tick_ms, succeeds }
        }),
    ]
}

/// Simulated transport: executes the connector's actions and reports the
/// outcomes back, the way the real driver does.
struct Driver {
    conn: FeedConnector<TestInstant>,
    now: TestInstant,
    socket_open: bool,
}

impl Driver {
    fn new(tenant: Option<TenantId>) -> Self {
        let config = FeedConfig::new("wss://api.example/ws/activity");
        Self {
            conn: FeedConnector::new(config, tenant).expect("config is valid"),
            now: TestInstant(0),
            socket_open: false,
        }
    }

    /// Execute actions, resolving any `Open` with the given outcome.
    /// Returns an error string on invariant violation.
    fn execute(&mut self, actions: Vec<FeedAction>, open_succeeds: bool) -> Result<(), String> {
        let mut follow_ups = Vec::new();

        for action in actions {
            match action {
                FeedAction::Close => self.socket_open = false,
                FeedAction::Open { url } => {
                    if self.socket_open {
                        return Err("Open issued while a socket is already live".to_string());
                    }
                    let tenant = self
                        .conn
                        .tenant()
                        .ok_or_else(|| "Open issued without a tenant".to_string())?;
                    let expected = format!("wss://api.example/ws/activity?gym_id={tenant}");
                    if url != expected {
                        return Err(format!("unexpected feed URL: {url}"));
                    }

                    if open_succeeds {
                        self.socket_open = true;
                        follow_ups.push(FeedEvent::Opened);
                    } else {
                        follow_ups.push(FeedEvent::TransportError {
                            reason: "connection refused".to_string(),
                        });
                        follow_ups.push(FeedEvent::Closed { now: self.now });
                    }
                },
                FeedAction::Notify(_) => {},
            }
        }

        for event in follow_ups {
            let actions = self.conn.handle(event);
            self.execute(actions, open_succeeds)?;
        }
        Ok(())
    }

    fn apply(&mut self, stimulus: Stimulus) -> Result<(), String> {
        match stimulus {
            Stimulus::Connect { succeeds } => {
                let actions = self.conn.handle(FeedEvent::Connect);
                self.execute(actions, succeeds)
            },
            Stimulus::Disconnect => {
                let actions = self.conn.handle(FeedEvent::Disconnect);
                self.execute(actions, false)
            },
            Stimulus::TenantSwitch(gym) => {
                let tenant = gym.map(|id| TenantId::new(id.to_string()));
                let actions = self.conn.handle(FeedEvent::TenantChanged { tenant, now: self.now });
                self.execute(actions, false)
            },
            Stimulus::Frame(text) => {
                if !self.socket_open {
                    return Ok(());
                }
                let actions = self.conn.handle(FeedEvent::MessageReceived { text });
                self.execute(actions, false)
            },
            Stimulus::Drop => {
                if !self.socket_open {
                    return Ok(());
                }
                self.socket_open = false;
                let actions = self
                    .conn
                    .handle(FeedEvent::TransportError { reason: "connection reset".to_string() });
                self.execute(actions, false)?;
                let actions = self.conn.handle(FeedEvent::Closed { now: self.now });
                self.execute(actions, false)
            },
            Stimulus::Advance { ticks, tick_ms, succeeds } => {
                for _ in 0..ticks {
                    self.now = TestInstant(self.now.0 + u64::from(tick_ms));
                    let actions = self.conn.handle(FeedEvent::Tick { now: self.now });
                    self.execute(actions, succeeds)?;
                }
                Ok(())
            },
        }
    }

    fn check_invariants(&self) -> Result<(), String> {
        let max = 5;
        if self.conn.reconnect_attempts() > max {
            return Err(format!("attempts {} exceed the cap", self.conn.reconnect_attempts()));
        }

        if let Some(delay) = self.conn.scheduled_backoff() {
            if delay > Duration::from_secs(30) {
                return Err(format!("scheduled backoff {delay:?} exceeds the ceiling"));
            }
        }

        if self.conn.status() == FeedStatus::Connected {
            if !self.socket_open {
                return Err("status Connected without a live socket".to_string());
            }
            if self.conn.scheduled_backoff().is_some() {
                return Err("reconnect pending while connected".to_string());
            }
        }
        Ok(())
    }
}

#[test]
fn prop_invariants_hold_under_arbitrary_stimuli() {
    proptest!(|(
        tenant in proptest::option::of(0u8..4),
        stimuli in prop::collection::vec(arbitrary_stimulus(), 0..40),
    )| {
        let mut driver = Driver::new(tenant.map(|id| TenantId::new(id.to_string())));

        for stimulus in stimuli {
            if let Err(violation) = driver.apply(stimulus) {
                return Err(TestCaseError::fail(violation));
            }
            if let Err(violation) = driver.check_invariants() {
                return Err(TestCaseError::fail(violation));
            }
        }
    });
}

#[test]
fn prop_arbitrary_frames_never_break_a_live_connection() {
    proptest!(|(frames in prop::collection::vec(arbitrary_frame(), 1..20))| {
        let mut driver = Driver::new(Some(TenantId::new("1")));
        driver.apply(Stimulus::Connect { succeeds: true }).expect("connect");
        prop_assert_eq!(driver.conn.status(), FeedStatus::Connected);

        for text in frames {
            driver.apply(Stimulus::Frame(text)).expect("frame");
            prop_assert_eq!(driver.conn.status(), FeedStatus::Connected);
        }
    });
}

#[test]
fn prop_backoff_doubles_while_reconnects_keep_failing() {
    proptest!(|(failures in 1u32..=4)| {
        let mut driver = Driver::new(Some(TenantId::new("1")));
        driver.apply(Stimulus::Connect { succeeds: true }).expect("connect");
        driver.apply(Stimulus::Drop).expect("drop");

        let mut observed = Vec::new();
        for _ in 0..failures {
            let delay = driver.conn.scheduled_backoff().expect("reconnect scheduled");
            observed.push(delay.as_millis() as u64);

            // The deadline fires and the reconnect attempt fails, which
            // schedules the next deadline with a doubled delay.
            driver
                .apply(Stimulus::Advance {
                    ticks: 1,
                    tick_ms: delay.as_millis() as u16,
                    succeeds: false,
                })
                .expect("advance");
        }

        let expected: Vec<u64> = (0..failures).map(|attempt| 1000u64 << attempt).collect();
        prop_assert_eq!(observed, expected);

        // A success at any point resets the progression.
        let delay = driver.conn.scheduled_backoff().expect("reconnect scheduled");
        driver
            .apply(Stimulus::Advance { ticks: 1, tick_ms: delay.as_millis() as u16, succeeds: true })
            .expect("advance");
        prop_assert_eq!(driver.conn.status(), FeedStatus::Connected);
        prop_assert_eq!(driver.conn.reconnect_attempts(), 0);
    });
}
