//! Feed driver task.
//!
//! Event loop that owns the WebSocket and drives the `spotter-core` state
//! machine. Uses `tokio::select!` over three sources: inbound frames, the
//! tick clock for deadline processing, and the application command channel.
//! Every transition goes through [`FeedConnector::handle`]; this module only
//! executes the returned actions.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use futures_util::{SinkExt, StreamExt};
use spotter_core::{ConfigError, FeedAction, FeedConfig, FeedConnector, FeedEvent, FeedNotification, TenantId};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, time::MissedTickBehavior};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use crate::FeedHooks;

/// Deadline-processing granularity. Fine enough that reconnects fire within
/// a tick of their scheduled delay.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Command channel depth.
const COMMAND_BUFFER: usize = 32;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands the application sends to the driver task.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    /// Open the feed.
    Connect,
    /// Close the feed and cancel any pending reconnect.
    Disconnect,
    /// Switch to a different tenant (or to none).
    SetTenant(Option<TenantId>),
    /// Close the feed and end the driver task.
    Shutdown,
}

/// Errors from a [`FeedHandle`].
#[derive(Debug, Error)]
pub enum HandleError {
    /// The driver task is no longer running.
    #[error("feed driver task has stopped")]
    Stopped,
}

/// Handle to a running feed driver task.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
    abort_handle: tokio::task::AbortHandle,
}

impl FeedHandle {
    /// Ask the driver to open the feed.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Stopped`] if the driver task has ended.
    pub async fn connect(&self) -> Result<(), HandleError> {
        self.send(FeedCommand::Connect).await
    }

    /// Ask the driver to close the feed.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Stopped`] if the driver task has ended.
    pub async fn disconnect(&self) -> Result<(), HandleError> {
        self.send(FeedCommand::Disconnect).await
    }

    /// Switch the feed to a different tenant. The driver reconnects against
    /// the new tenant after a short settle delay.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Stopped`] if the driver task has ended.
    pub async fn set_tenant(&self, tenant: Option<TenantId>) -> Result<(), HandleError> {
        self.send(FeedCommand::SetTenant(tenant)).await
    }

    /// Close the feed and end the driver task gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Stopped`] if the driver task has ended.
    pub async fn shutdown(&self) -> Result<(), HandleError> {
        self.send(FeedCommand::Shutdown).await
    }

    /// Abort the driver task without a graceful close.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }

    async fn send(&self, command: FeedCommand) -> Result<(), HandleError> {
        self.commands.send(command).await.map_err(|_| HandleError::Stopped)
    }
}

/// Spawn the feed driver task.
///
/// The task runs until [`FeedHandle::shutdown`] or [`FeedHandle::stop`] is
/// called, or every handle is dropped.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the configuration is invalid.
pub fn spawn_feed<H: FeedHooks>(
    config: FeedConfig,
    tenant: Option<TenantId>,
    hooks: H,
) -> Result<FeedHandle, ConfigError> {
    let conn = FeedConnector::new(config, tenant)?;
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);

    let task = tokio::spawn(run(conn, receiver, hooks));
    Ok(FeedHandle { commands, abort_handle: task.abort_handle() })
}

/// Driver event loop.
async fn run<H: FeedHooks>(
    mut conn: FeedConnector,
    mut commands: mpsc::Receiver<FeedCommand>,
    mut hooks: H,
) {
    let mut socket: Option<Socket> = None;
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let actions = tokio::select! {
            _ = tick.tick() => conn.handle(FeedEvent::Tick { now: Instant::now() }),

            command = commands.recv() => match command {
                Some(FeedCommand::Connect) => conn.handle(FeedEvent::Connect),
                Some(FeedCommand::Disconnect) => conn.handle(FeedEvent::Disconnect),
                Some(FeedCommand::SetTenant(tenant)) => {
                    conn.handle(FeedEvent::TenantChanged { tenant, now: Instant::now() })
                },
                Some(FeedCommand::Shutdown) | None => {
                    let actions = conn.handle(FeedEvent::Disconnect);
                    execute(&mut conn, &mut socket, &mut hooks, actions).await;
                    tracing::debug!("feed driver task ending");
                    return;
                },
            },

            frame = next_frame(&mut socket), if socket.is_some() => match frame {
                Some(Ok(Message::Text(text))) => {
                    conn.handle(FeedEvent::MessageReceived { text: text.to_string() })
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Some(stream) = socket.as_mut()
                        && let Err(error) = stream.send(Message::Pong(payload)).await
                    {
                        tracing::warn!(%error, "failed to answer ping");
                    }
                    Vec::new()
                },
                Some(Ok(Message::Close(_))) | None => {
                    socket = None;
                    conn.handle(FeedEvent::Closed { now: Instant::now() })
                },
                Some(Ok(_)) => Vec::new(),
                Some(Err(error)) => {
                    socket = None;
                    let mut actions =
                        conn.handle(FeedEvent::TransportError { reason: error.to_string() });
                    actions.extend(conn.handle(FeedEvent::Closed { now: Instant::now() }));
                    actions
                },
            },
        };

        execute(&mut conn, &mut socket, &mut hooks, actions).await;
    }
}

/// Read the next frame from the socket. Guarded by `socket.is_some()` in the
/// select, so the pending branch is unreachable in practice.
async fn next_frame(
    socket: &mut Option<Socket>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match socket {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Execute the connector's actions. An `Open` that fails at the transport is
/// reported back into the state machine, which may queue further actions.
async fn execute<H: FeedHooks>(
    conn: &mut FeedConnector,
    socket: &mut Option<Socket>,
    hooks: &mut H,
    actions: Vec<FeedAction>,
) {
    let mut queue: VecDeque<FeedAction> = actions.into();

    while let Some(action) = queue.pop_front() {
        match action {
            FeedAction::Close => {
                if let Some(mut stream) = socket.take() {
                    if let Err(error) = stream.close(None).await {
                        tracing::debug!(%error, "error closing feed socket");
                    }
                }
            },
            FeedAction::Open { url } => match connect_async(url.as_str()).await {
                Ok((stream, _response)) => {
                    *socket = Some(stream);
                    queue.extend(conn.handle(FeedEvent::Opened));
                },
                Err(error) => {
                    tracing::warn!(%error, "feed connection attempt failed");
                    queue.extend(
                        conn.handle(FeedEvent::TransportError { reason: error.to_string() }),
                    );
                    queue.extend(conn.handle(FeedEvent::Closed { now: Instant::now() }));
                },
            },
            FeedAction::Notify(notification) => match notification {
                FeedNotification::Connected => hooks.on_connect(),
                FeedNotification::Activity(event) => hooks.on_activity(event),
                FeedNotification::Error { reason } => hooks.on_error(&reason),
                FeedNotification::Disconnected => hooks.on_disconnect(),
            },
        }
    }
}
