//! Wire types for the Spotter realtime layer.
//!
//! The backend exposes two JSON surfaces this crate models:
//!
//! - The activity feed WebSocket, which pushes [`Envelope`] objects wrapping
//!   [`ActivityEvent`] payloads.
//! - The chat history REST endpoint, which returns [`ChatMessage`] lists that
//!   the conversation cache in `spotter-core` stores per room.
//!
//! # Invariants
//!
//! Envelopes with an unrecognized `type` decode to [`Envelope::Unknown`]
//! rather than failing; only syntactically invalid JSON (or a payload that
//! does not match the envelope shape) is an [`EnvelopeError`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod ids;
mod message;

pub use envelope::{ActivityEvent, Envelope, EnvelopeError};
pub use ids::{MessageId, RoomId, TenantId};
pub use message::ChatMessage;
