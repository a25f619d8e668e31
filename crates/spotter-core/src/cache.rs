//! Conversation cache.
//!
//! Per-room in-memory store of chat messages and their live-channel handles.
//! Revisiting a conversation within one session hits the cache instead of
//! refetching history or attaching a second message listener.
//!
//! # Invariants
//!
//! - Message identifiers are unique within a room's entry; duplicate inserts
//!   are dropped silently (the realtime transport may redeliver).
//! - A channel handle is owned exclusively by its room entry; it is detached
//!   when replaced and when the cache is cleared, never leaked.
//! - Entries are created lazily on first write and live until [`clear`]
//!   (session teardown). There is no per-entry expiry and no size bound; the
//!   cache lives for one UI session and [`stats`] exposes its growth.
//!
//! [`clear`]: ConversationCache::clear
//! [`stats`]: ConversationCache::stats

use std::collections::{HashMap, HashSet};

use spotter_proto::{ChatMessage, MessageId, RoomId};

/// Opaque handle to a live chat channel subscription.
///
/// The cache owns one handle per room and guarantees [`detach`] is called
/// exactly once before the handle is dropped, so registered message
/// listeners are never leaked across logins.
///
/// [`detach`]: ChannelHandle::detach
pub trait ChannelHandle {
    /// Remove any message listener registered on this channel.
    fn detach(&mut self);
}

/// Diagnostic counters for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached rooms.
    pub rooms: usize,
    /// Total cached messages across all rooms.
    pub messages: usize,
}

/// Cached state for one room.
#[derive(Debug)]
struct RoomEntry<C, I> {
    /// Messages in arrival order.
    messages: Vec<ChatMessage>,
    /// Identifiers already present, for duplicate suppression.
    seen: HashSet<MessageId>,
    /// Live channel handle, exclusively owned.
    channel: Option<C>,
    /// Time of the most recent mutation.
    last_update: Option<I>,
    /// True once an authoritative message list has been stored.
    loaded: bool,
}

impl<C, I> RoomEntry<C, I> {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            seen: HashSet::new(),
            channel: None,
            last_update: None,
            loaded: false,
        }
    }
}

/// In-memory cache of chat conversations, keyed by room.
///
/// Generic over the channel handle type `C` and the instant type `I`; time
/// enters only through method parameters, never from a clock.
#[derive(Debug)]
pub struct ConversationCache<C, I = std::time::Instant> {
    rooms: HashMap<RoomId, RoomEntry<C, I>>,
}

impl<C, I> ConversationCache<C, I>
where
    C: ChannelHandle,
    I: Copy,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { rooms: HashMap::new() }
    }

    /// Messages cached for a room, in arrival order. Empty if the room has
    /// never been written. No side effects.
    #[must_use]
    pub fn messages(&self, room: &RoomId) -> &[ChatMessage] {
        self.rooms.get(room).map_or(&[], |entry| entry.messages.as_slice())
    }

    /// Replace a room's message list wholesale with an authoritative fetch
    /// result and mark the room loaded.
    pub fn set_messages(&mut self, room: RoomId, messages: Vec<ChatMessage>, now: I) {
        let entry = self.rooms.entry(room).or_insert_with(RoomEntry::new);

        entry.seen = messages.iter().map(|message| message.id.clone()).collect();
        entry.messages = messages;
        entry.loaded = true;
        entry.last_update = Some(now);
    }

    /// Append one message unless its identifier is already cached.
    ///
    /// Returns `true` only when an insert actually occurred; callers use
    /// this as the UI-refresh signal so duplicate deliveries do not trigger
    /// redundant re-renders.
    pub fn add_message(&mut self, room: RoomId, message: ChatMessage, now: I) -> bool {
        let entry = self.rooms.entry(room).or_insert_with(RoomEntry::new);

        if !entry.seen.insert(message.id.clone()) {
            tracing::debug!(id = %message.id, "duplicate message delivery dropped");
            return false;
        }

        entry.messages.push(message);
        entry.last_update = Some(now);
        true
    }

    /// Channel handle for a room, if one is registered.
    #[must_use]
    pub fn channel(&self, room: &RoomId) -> Option<&C> {
        self.rooms.get(room).and_then(|entry| entry.channel.as_ref())
    }

    /// Register the channel handle for a room, lazily creating the entry.
    /// A previously registered handle is detached before being replaced.
    pub fn set_channel(&mut self, room: RoomId, channel: C, now: I) {
        let entry = self.rooms.entry(room).or_insert_with(RoomEntry::new);

        if let Some(mut previous) = entry.channel.replace(channel) {
            previous.detach();
        }
        entry.last_update = Some(now);
    }

    /// Whether an authoritative message list has been stored for the room.
    /// Distinguishes "empty but synced" from "never fetched".
    #[must_use]
    pub fn is_loaded(&self, room: &RoomId) -> bool {
        self.rooms.get(room).is_some_and(|entry| entry.loaded)
    }

    /// Time of the room's most recent mutation.
    #[must_use]
    pub fn last_update(&self, room: &RoomId) -> Option<I> {
        self.rooms.get(room).and_then(|entry| entry.last_update)
    }

    /// Detach every registered channel handle, then discard all entries.
    ///
    /// Must be called on logout / session teardown.
    pub fn clear(&mut self) {
        let mut detached = 0usize;
        for entry in self.rooms.values_mut() {
            if let Some(mut channel) = entry.channel.take() {
                channel.detach();
                detached += 1;
            }
        }

        tracing::info!(rooms = self.rooms.len(), detached, "conversation cache cleared");
        self.rooms.clear();
    }

    /// Diagnostic counters: cached rooms and total cached messages.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            rooms: self.rooms.len(),
            messages: self.rooms.values().map(|entry| entry.messages.len()).sum(),
        }
    }
}

impl<C, I> Default for ConversationCache<C, I>
where
    C: ChannelHandle,
    I: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
