//! Chat message records.

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// A single chat message as returned by the backend history endpoint and
/// delivered over the live chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Backend-assigned identifier, unique within the room.
    pub id: MessageId,

    /// Display name of the sender.
    pub sender: String,

    /// Message body.
    pub body: String,

    /// Backend timestamp in epoch milliseconds.
    pub sent_at: u64,
}

impl ChatMessage {
    /// Construct a message record.
    pub fn new(
        id: impl Into<MessageId>,
        sender: impl Into<String>,
        body: impl Into<String>,
        sent_at: u64,
    ) -> Self {
        Self { id: id.into(), sender: sender.into(), body: body.into(), sent_at }
    }
}
