//! Property-based tests for envelope decoding.
//!
//! The feed socket is an external input: decoding must never panic, unknown
//! envelope kinds must never be errors, and activity payloads must survive a
//! round-trip exactly.

use proptest::prelude::*;
use serde_json::Value;
use spotter_proto::{ActivityEvent, Envelope};

/// Strategy for envelope kind strings the client does not recognize.
fn unknown_kind() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}".prop_filter("must not collide with known kinds", |kind| {
        kind != "connection" && kind != "activity"
    })
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(text in ".{0,256}")| {
        // PROPERTY: arbitrary input either decodes or errors, never panics.
        let _ = Envelope::decode(&text);
    });
}

#[test]
fn prop_unknown_kinds_decode_to_unknown() {
    proptest!(|(kind in unknown_kind(), payload in "[a-z0-9 ]{0,32}")| {
        let json = serde_json::json!({ "type": kind, "detail": payload }).to_string();

        let envelope = Envelope::decode(&json).expect("well-formed JSON must decode");
        prop_assert_eq!(envelope, Envelope::Unknown);
    });
}

#[test]
fn prop_activity_roundtrip() {
    proptest!(|(
        id in any::<u64>(),
        kind in "[a-z]{1,12}",
        extra_key in "[a-z]{1,8}",
        extra_value in "[a-zA-Z0-9 ]{0,24}",
    )| {
        let mut event = ActivityEvent::new(id, kind);
        // `id` and `kind` are reserved by the event itself; flattened extras
        // must not shadow them.
        prop_assume!(extra_key != "id" && extra_key != "kind");
        event.extra.insert(extra_key, Value::from(extra_value));

        let envelope = Envelope::Activity { data: Some(event) };
        let json = envelope.encode().expect("encode should succeed");
        let decoded = Envelope::decode(&json).expect("decode should succeed");

        // PROPERTY: round-trip must be identity.
        prop_assert_eq!(decoded, envelope);
    });
}

#[test]
fn prop_connection_message_preserved() {
    proptest!(|(message in proptest::option::of("[ -~]{0,64}"))| {
        let envelope = Envelope::Connection { message };
        let json = envelope.encode().expect("encode should succeed");
        let decoded = Envelope::decode(&json).expect("decode should succeed");

        prop_assert_eq!(decoded, envelope);
    });
}
