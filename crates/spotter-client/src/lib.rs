//! Tokio driver for the Spotter realtime feed.
//!
//! `spotter-core` holds the pure state machine; this crate supplies the I/O
//! around it: a WebSocket transport, a tick clock, a command channel, and
//! delivery of notifications to application hooks.
//!
//! # Usage
//!
//! ```no_run
//! use spotter_client::{FeedHooks, spawn_feed};
//! use spotter_core::{FeedConfig, TenantId};
//! use spotter_proto::ActivityEvent;
//!
//! struct Printer;
//!
//! impl FeedHooks for Printer {
//!     fn on_activity(&mut self, event: ActivityEvent) {
//!         println!("{}: {}", event.id, event.kind);
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FeedConfig::new("wss://api.example/ws/activity");
//! let handle = spawn_feed(config, Some(TenantId::new("42")), Printer)?;
//! handle.connect().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod hooks;
mod runtime;

pub use hooks::FeedHooks;
pub use runtime::{FeedCommand, FeedHandle, HandleError, spawn_feed};
