//! WebSocket push channel with auto-reconnect.
//!
//! Connects to the telemetry server's push endpoint and forwards parsed
//! events through a [`tokio::sync::mpsc`] queue. Network drops are
//! recovered with exponential backoff + jitter; a server-initiated close
//! parks the connection until [`PushChannel::reconnect`] is called.
//!
//! Frames are JSON text messages of the shape
//! `{ "event": "new_data", "data": { "battery_data": [...], ... } }`.
//!
//! # Example
//!
//! ```rust,ignore
//! use telesync_api::{PushChannel, PushEvent, ReconnectConfig, WebSocketChannel};
//!
//! let channel = WebSocketChannel::new("ws://127.0.0.1:5000/ws".parse()?, ReconnectConfig::default());
//! let mut events = channel.open().await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let PushEvent::NewData(Some(snapshot)) = event {
//!         println!("{} points", snapshot.total_points());
//!     }
//! }
//!
//! channel.close().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::model::Snapshot;
use crate::push::{DisconnectReason, PushChannel, PushEvent, PushEvents};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ── Event queue capacity ─────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before parking until an
    /// explicit reconnect. `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── WebSocketChannel ─────────────────────────────────────────────────

/// [`PushChannel`] backed by a WebSocket connection.
pub struct WebSocketChannel {
    url: Url,
    reconnect: ReconnectConfig,
    session: Mutex<Option<Session>>,
}

/// Control handles for the background task of one opened connection.
struct Session {
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

impl WebSocketChannel {
    /// Create a channel for `url`. Does NOT connect; call [`PushChannel::open`].
    pub fn new(url: Url, reconnect: ReconnectConfig) -> Self {
        Self {
            url,
            reconnect,
            session: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl PushChannel for WebSocketChannel {
    async fn open(&self) -> Result<PushEvents, Error> {
        self.close().await;

        let ws = connect(&self.url).await?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());

        let ctx = LoopContext {
            url: self.url.clone(),
            events: event_tx,
            reconnect: self.reconnect.clone(),
            cancel: cancel.clone(),
            wake: Arc::clone(&wake),
        };
        tokio::spawn(ws_loop(ctx, ws));

        *self.session.lock().await = Some(Session { cancel, wake });
        Ok(event_rx)
    }

    async fn reconnect(&self) -> Result<(), Error> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(Error::ChannelClosed)?;
        debug!(url = %self.url, "push channel reconnect requested");
        // Stores a permit if the loop is not currently waiting.
        session.wake.notify_one();
        Ok(())
    }

    async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            debug!(url = %self.url, "closing push channel");
            session.cancel.cancel();
        }
    }
}

// ── Background connection loop ───────────────────────────────────────

struct LoopContext {
    url: Url,
    events: mpsc::Sender<PushEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

impl LoopContext {
    /// Forward an event. Returns `false` once the consumer is gone.
    async fn emit(&self, event: PushEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Park until an explicit reconnect. Returns `false` on cancellation.
    async fn wait_for_wake(&self) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = self.wake.notified() => true,
        }
    }

    /// Sleep for `delay`, cut short by an explicit reconnect.
    /// Returns `false` on cancellation.
    async fn backoff(&self, delay: Duration) -> bool {
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before push reconnect"
        );
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = self.wake.notified() => true,
            () = tokio::time::sleep(delay) => true,
        }
    }
}

/// How a single connection ended.
enum Closed {
    /// Server sent a close frame.
    Server,
    /// Local reconnect request.
    Requested,
    /// Stream error or end of stream without a close frame.
    Network(Error),
    /// Channel closed locally or the consumer went away.
    Cancelled,
}

/// Main loop: read → on drop, backoff → reconnect.
async fn ws_loop(ctx: LoopContext, initial: WsStream) {
    let mut pending = Some(initial);
    let mut attempt: u32 = 0;

    loop {
        let ws = if let Some(ws) = pending.take() {
            ws
        } else {
            let result = tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => break,
                result = connect(&ctx.url) => result,
            };

            match result {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(error = %e, attempt, "Push channel reconnect failed");
                    if !ctx.emit(PushEvent::Error(e.to_string())).await {
                        break;
                    }

                    if ctx.reconnect.max_retries.is_some_and(|max| attempt >= max) {
                        error!(
                            max_retries = ctx.reconnect.max_retries,
                            "Push reconnection limit reached, waiting for explicit reconnect"
                        );
                        attempt = 0;
                        if !ctx.wait_for_wake().await {
                            break;
                        }
                        continue;
                    }

                    let delay = calculate_backoff(attempt, &ctx.reconnect);
                    attempt += 1;
                    if !ctx.backoff(delay).await {
                        break;
                    }
                    continue;
                }
            }
        };

        attempt = 0;
        info!(url = %ctx.url, "Push channel connected");
        if !ctx.emit(PushEvent::Connected).await {
            break;
        }

        match read_until_closed(ws, &ctx).await {
            Closed::Cancelled => break,
            Closed::Server => {
                if !ctx
                    .emit(PushEvent::Disconnected(DisconnectReason::ServerInitiated))
                    .await
                {
                    break;
                }
                // The server asked us to leave; only an explicit reconnect brings us back.
                if !ctx.wait_for_wake().await {
                    break;
                }
            }
            Closed::Requested => {
                if !ctx
                    .emit(PushEvent::Disconnected(DisconnectReason::ClientInitiated))
                    .await
                {
                    break;
                }
            }
            Closed::Network(e) => {
                warn!(error = %e, "Push channel dropped");
                if !ctx
                    .emit(PushEvent::Disconnected(DisconnectReason::Network))
                    .await
                {
                    break;
                }
                let delay = calculate_backoff(0, &ctx.reconnect);
                attempt = 1;
                if !ctx.backoff(delay).await {
                    break;
                }
            }
        }
    }

    debug!("Push channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect(url: &Url) -> Result<WsStream, Error> {
    info!(url = %url, "Connecting push channel");

    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    Ok(ws)
}

/// Read frames from one connection until it ends.
async fn read_until_closed(ws: WsStream, ctx: &LoopContext) -> Closed {
    let (_write, mut read) = ws.split();

    loop {
        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Closed::Cancelled,
            () = ctx.wake.notified() => return Closed::Requested,
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = parse_message(text.as_str()) {
                            if !ctx.emit(event).await {
                                return Closed::Cancelled;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        trace!("Push channel ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            info!(code = %cf.code, reason = %cf.reason, "Push close frame received");
                        } else {
                            info!("Push close frame received (no payload)");
                        }
                        return Closed::Server;
                    }
                    Some(Err(e)) => {
                        return Closed::Network(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        return Closed::Network(Error::WebSocketClosed {
                            code: 1006,
                            reason: "stream ended without close frame".into(),
                        });
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse a text frame into a push event.
///
/// Malformed `new_data` payloads are dropped so the consumer keeps its
/// previous snapshot.
fn parse_message(text: &str) -> Option<PushEvent> {
    let envelope: PushEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            debug!(error = %e, "Failed to parse push envelope");
            return None;
        }
    };

    match envelope.event.as_str() {
        "new_data" => {
            if envelope.data.is_null() {
                return Some(PushEvent::NewData(None));
            }
            match serde_json::from_value::<Snapshot>(envelope.data) {
                Ok(snapshot) => Some(PushEvent::NewData(Some(snapshot))),
                Err(e) => {
                    debug!(error = %e, "Discarding malformed new_data payload");
                    None
                }
            }
        }
        other => {
            trace!(event = other, "Ignoring push message");
            None
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`, jitter is +-25%.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
