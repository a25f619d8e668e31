//! Core
//!
//! The two state-bearing components of the Spotter realtime layer, written
//! Sans-IO: no sockets, no timers, no callbacks. A driver (see
//! `spotter-client`) feeds in events and executes the returned actions.
//!
//! # Components
//!
//! - [`FeedConnector`]: state machine for the tenant-scoped activity feed
//!   connection, including bounded exponential-backoff reconnection
//! - [`ConversationCache`]: per-room in-memory store of chat messages and
//!   live-channel handles
//!
//! # Architecture
//!
//! Both components are generic over an `Instant` type (`I: Copy + Ord +
//! Sub<Output = Duration>`) so tests drive time manually and production code
//! passes `std::time::Instant`. Time only ever enters through method
//! parameters; the state machines never read a clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cache;
mod config;
mod connector;
mod error;

pub use cache::{CacheStats, ChannelHandle, ConversationCache};
pub use config::{
    DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_SETTLE_DELAY, FeedConfig,
};
pub use connector::{FeedAction, FeedConnector, FeedEvent, FeedNotification, FeedStatus};
pub use error::ConfigError;
pub use spotter_proto::{ActivityEvent, ChatMessage, MessageId, RoomId, TenantId};
