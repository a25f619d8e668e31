//! Activity feed envelopes.
//!
//! Every message on the feed socket is a JSON object with a `type`
//! discriminator. Two kinds are specified: `connection` (server greeting on
//! open) and `activity` (a domain event). The backend may introduce new kinds
//! at any time, so anything else decodes to [`Envelope::Unknown`] and the
//! connector drops it silently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from envelope decoding.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload was not valid JSON or did not match the envelope shape.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Outer wrapper distinguishing message kinds on the realtime stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Server acknowledgement sent once after the socket opens.
    Connection {
        /// Optional human-readable greeting.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A domain event pushed to the dashboard.
    Activity {
        /// Event payload. Absent on heartbeat-style activity frames.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ActivityEvent>,
    },

    /// Any envelope kind this client does not recognize.
    ///
    /// Forward compatibility: unrecognized kinds are ignored, not errors.
    #[serde(other)]
    Unknown,
}

impl Envelope {
    /// Decode an envelope from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if the text is not valid JSON or
    /// does not match the envelope shape.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode an envelope to JSON.
    ///
    /// Primarily for tests and tooling; the connector itself is a read-only
    /// consumer of the feed.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if serialization fails.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A single activity event (check-in, booking, payment, ...).
///
/// The backend attaches event-specific detail as additional fields; those are
/// preserved verbatim in [`extra`](Self::extra) so consumers can render them
/// without this crate enumerating every event shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Backend-assigned event identifier.
    pub id: u64,

    /// Event kind, e.g. `"checkin"` or `"booking"`.
    pub kind: String,

    /// Event-specific fields not modeled by this client.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ActivityEvent {
    /// Create an event with no extra detail.
    pub fn new(id: u64, kind: impl Into<String>) -> Self {
        Self { id, kind: kind.into(), extra: Map::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_connection_envelope() {
        let envelope =
            Envelope::decode(r#"{"type":"connection","message":"connected to activity feed"}"#)
                .unwrap();

        assert_eq!(envelope, Envelope::Connection {
            message: Some("connected to activity feed".to_string()),
        });
    }

    #[test]
    fn decode_connection_without_message() {
        let envelope = Envelope::decode(r#"{"type":"connection"}"#).unwrap();
        assert_eq!(envelope, Envelope::Connection { message: None });
    }

    #[test]
    fn decode_activity_envelope() {
        let envelope =
            Envelope::decode(r#"{"type":"activity","data":{"id":7,"kind":"checkin"}}"#).unwrap();

        match envelope {
            Envelope::Activity { data: Some(event) } => {
                assert_eq!(event.id, 7);
                assert_eq!(event.kind, "checkin");
                assert!(event.extra.is_empty());
            },
            other => panic!("expected activity envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_activity_preserves_extra_fields() {
        let envelope = Envelope::decode(
            r#"{"type":"activity","data":{"id":3,"kind":"booking","member":"ada","class":"hiit"}}"#,
        )
        .unwrap();

        match envelope {
            Envelope::Activity { data: Some(event) } => {
                assert_eq!(event.extra.get("member"), Some(&Value::from("ada")));
                assert_eq!(event.extra.get("class"), Some(&Value::from("hiit")));
            },
            other => panic!("expected activity envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_activity_without_data() {
        let envelope = Envelope::decode(r#"{"type":"activity"}"#).unwrap();
        assert_eq!(envelope, Envelope::Activity { data: None });
    }

    #[test]
    fn unrecognized_type_is_unknown_not_error() {
        let envelope = Envelope::decode(r#"{"type":"presence","who":"bob"}"#).unwrap();
        assert_eq!(envelope, Envelope::Unknown);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Envelope::decode("{not valid").is_err());
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(Envelope::decode(r#"{"message":"hi"}"#).is_err());
    }

    #[test]
    fn activity_roundtrip() {
        let mut event = ActivityEvent::new(11, "payment");
        event.extra.insert("amount".to_string(), Value::from(4200));

        let envelope = Envelope::Activity { data: Some(event) };
        let json = envelope.encode().unwrap();
        let back = Envelope::decode(&json).unwrap();

        assert_eq!(back, envelope);
    }
}
