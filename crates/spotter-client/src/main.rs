//! Spotter feed binary.
//!
//! Connects to a gym's realtime activity feed and logs every event. Useful
//! for watching a feed during development and for smoke-testing a backend.
//!
//! # Usage
//!
//! ```bash
//! spotter-feed --url wss://api.example/ws/activity --gym 42
//! ```

use clap::Parser;
use spotter_client::{FeedHooks, spawn_feed};
use spotter_core::{DEFAULT_MAX_RECONNECT_ATTEMPTS, FeedConfig, TenantId};
use spotter_proto::ActivityEvent;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Spotter realtime feed watcher
#[derive(Parser, Debug)]
#[command(name = "spotter-feed")]
#[command(about = "Watch a gym's realtime activity feed")]
#[command(version)]
struct Args {
    /// Feed endpoint (ws:// or wss://)
    #[arg(short, long)]
    url: String,

    /// Gym identifier the feed is scoped to
    #[arg(short, long)]
    gym: String,

    /// Maximum reconnect attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    max_attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Hooks that log every feed event.
struct LogHooks;

impl FeedHooks for LogHooks {
    fn on_connect(&mut self) {
        tracing::info!("feed connected");
    }

    fn on_activity(&mut self, event: ActivityEvent) {
        tracing::info!(id = event.id, kind = %event.kind, "activity");
    }

    fn on_error(&mut self, reason: &str) {
        tracing::warn!(%reason, "feed error");
    }

    fn on_disconnect(&mut self) {
        tracing::info!("feed disconnected");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    // Reject malformed endpoints before the driver starts retrying them.
    let endpoint = Url::parse(&args.url)?;
    if !matches!(endpoint.scheme(), "ws" | "wss") {
        return Err(format!("unsupported feed scheme: {}", endpoint.scheme()).into());
    }

    let config =
        FeedConfig::new(args.url).with_max_reconnect_attempts(args.max_attempts);
    let handle = spawn_feed(config, Some(TenantId::new(args.gym)), LogHooks)?;

    handle.connect().await?;
    tracing::info!("watching feed; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await?;

    Ok(())
}
