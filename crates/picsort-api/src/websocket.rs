//! Duplex WebSocket event channel with auto-reconnect.
//!
//! Connects to the server's `/ws` endpoint, broadcasts every decoded inbound
//! frame through a [`tokio::sync::broadcast`] channel, and writes outbound
//! text frames handed to [`WebSocketHandle::send_text`]. Reconnection with
//! exponential backoff + jitter happens in the background; callers only see
//! it through [`LinkState`].
//!
//! Outbound policy is **drop**: a frame offered while the link is not
//! [`LinkState::Connected`] is discarded, and frames still queued when a
//! connection dies are discarded before the next connection starts writing.
//! Nothing is ever replayed after a reconnect.
//!
//! # Example
//!
//! ```rust,ignore
//! use picsort_api::websocket::{WebSocketHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let ws_url = Url::parse("ws://127.0.0.1:8000/ws")?;
//! let handle = WebSocketHandle::spawn(ws_url, ReconnectConfig::default(), CancellationToken::new());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{}", event.event);
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::protocol::Event;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── LinkState ────────────────────────────────────────────────────────

/// State of the transport underneath a [`WebSocketHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// First connection attempt in progress.
    Connecting,
    /// Connected; outbound frames are written.
    Connected,
    /// Transport lost, waiting for or performing reconnect `attempt`.
    Reconnecting { attempt: u32 },
    /// Background task has exited (shutdown or retry limit reached).
    Closed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
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

// ── WebSocketHandle ──────────────────────────────────────────────────

/// Handle to a running duplex event channel.
///
/// The background task runs until [`shutdown`](Self::shutdown) is called,
/// the retry limit is reached, or every handle is dropped while connected.
#[derive(Debug)]
pub struct WebSocketHandle {
    event_tx: broadcast::Sender<Arc<Event>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    state: watch::Receiver<LinkState>,
    cancel: CancellationToken,
}

impl WebSocketHandle {
    /// Spawn the connection loop on the current tokio runtime.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Subscribe before expecting events.
    pub fn spawn(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(LinkState::Connecting);

        let task_events = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, task_events, outbound_rx, state_tx, reconnect, task_cancel).await;
        });

        Self {
            event_tx,
            outbound_tx,
            state,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the inbound event stream.
    ///
    /// Multiple consumers can subscribe concurrently. If a consumer falls
    /// behind, it receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.event_tx.subscribe()
    }

    /// Offer a text frame for transmission.
    ///
    /// Returns `false` when the frame was dropped because the link is not
    /// connected or the background task is gone.
    pub fn send_text(&self, text: String) -> bool {
        if *self.state.borrow() != LinkState::Connected {
            tracing::debug!("dropping outbound frame, channel not connected");
            return false;
        }
        self.outbound_tx.send(text).is_ok()
    }

    /// Current link state.
    pub fn link_state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Subscribe to link state changes.
    pub fn state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read/write → backoff → reconnect.
///
/// A clean close and a transport error both count as a lost link and are
/// followed by a backoff delay. The attempt counter only resets once a
/// connection has delivered at least one inbound frame, so a server that
/// accepts and immediately closes is retried at a decaying rate.
async fn ws_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<Arc<Event>>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    state_tx: watch::Sender<LinkState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut first = true;

    loop {
        let state = if first {
            LinkState::Connecting
        } else {
            LinkState::Reconnecting { attempt }
        };
        state_tx.send_replace(state);
        first = false;

        let mut delivered = false;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_run(
                &ws_url,
                &event_tx,
                &mut outbound_rx,
                &state_tx,
                &cancel,
                &mut delivered,
            ) => result,
        };

        if cancel.is_cancelled() {
            break;
        }
        if delivered {
            attempt = 0;
        }
        state_tx.send_replace(LinkState::Reconnecting { attempt });

        match result {
            Ok(()) => tracing::info!(attempt, "WebSocket closed by server"),
            Err(e) => tracing::warn!(error = %e, attempt, "WebSocket error"),
        }

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(
                    max_retries = max,
                    "WebSocket reconnection limit reached, giving up"
                );
                break;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    state_tx.send_replace(LinkState::Closed);
    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection and pump frames until it drops.
///
/// Sets `delivered` once the server has sent at least one text frame.
async fn connect_and_run(
    url: &Url,
    event_tx: &broadcast::Sender<Arc<Event>>,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    state_tx: &watch::Sender<LinkState>,
    cancel: &CancellationToken,
    delivered: &mut bool,
) -> Result<(), Error> {
    tracing::info!(url = %url, "Connecting to WebSocket");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let stale = discard_stale(outbound_rx);
    if stale > 0 {
        tracing::debug!(stale, "discarded outbound frames from previous connection");
    }

    state_tx.send_replace(LinkState::Connected);
    tracing::info!("WebSocket connected");

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            outbound = outbound_rx.recv() => {
                let Some(text) = outbound else {
                    // Every handle is gone; nobody can send or listen anymore.
                    cancel.cancel();
                    return Ok(());
                };
                write
                    .send(tungstenite::Message::text(text))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        *delivered = true;
                        parse_and_broadcast(&text, event_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

/// Drop every frame still queued for a connection that no longer exists.
fn discard_stale(outbound_rx: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut stale = 0usize;
    while outbound_rx.try_recv().is_ok() {
        stale += 1;
    }
    stale
}

// ── Message parsing ──────────────────────────────────────────────────

/// Decode a text frame and broadcast it. Undecodable frames are skipped.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<Arc<Event>>) {
    let event: Event = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to decode WebSocket frame");
            return;
        }
    };

    tracing::trace!(event = %event.event, "inbound event");

    // Ignore send errors -- just means no active subscribers right now
    let _ = event_tx.send(Arc::new(event));
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn backoff_survives_huge_attempt_counts() {
        let config = ReconnectConfig::default();
        let d = calculate_backoff(u32::MAX, &config);
        assert!(d <= Duration::from_secs(38));
    }

    #[test]
    fn parse_and_broadcast_event_frame() {
        let (tx, mut rx) = broadcast::channel(16);

        parse_and_broadcast(r#"{"event":"rate_success","is_random":true}"#, &tx);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "rate_success");
        assert!(event.is_random());
    }

    #[test]
    fn parse_and_broadcast_keeps_frames_without_discriminator() {
        let (tx, mut rx) = broadcast::channel(16);

        parse_and_broadcast(r#"{"type":"echo"}"#, &tx);

        let event = rx.try_recv().unwrap();
        assert!(event.event.is_empty());
    }

    #[test]
    fn parse_and_broadcast_malformed_json() {
        let (tx, mut rx) = broadcast::channel::<Arc<Event>>(16);

        parse_and_broadcast("not json at all", &tx);
        parse_and_broadcast("[1, 2, 3]", &tx);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn frames_from_a_lost_connection_are_discarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("one".to_owned()).unwrap();
        tx.send("two".to_owned()).unwrap();

        assert_eq!(discard_stale(&mut rx), 2);
        assert!(rx.try_recv().is_err());

        tx.send("fresh".to_owned()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn send_before_connect_is_dropped() {
        // Nothing listens on port 9; the loop stays in Connecting/Reconnecting.
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        let cancel = CancellationToken::new();
        let handle = WebSocketHandle::spawn(url, ReconnectConfig::default(), cancel);

        assert!(!handle.send_text("{}".into()));
        assert_ne!(handle.link_state(), LinkState::Connected);
        handle.shutdown();
    }
}
