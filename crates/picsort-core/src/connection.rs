// ── Connection manager ──
//
// Owns the single duplex channel of a session. `connect` is idempotent:
// the first call spawns the transport, every later call returns the same
// handle. Reconnection happens underneath the handle and is never surfaced.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use picsort_api::{LinkState, ReconnectConfig, WebSocketHandle};

use crate::model::{ClientMessage, Event};
use crate::store::{EventLog, Subscription};

// ── Seams ────────────────────────────────────────────────────────────

/// Destination for outbound protocol messages.
///
/// Sending is fire-and-forget: implementations never report failure.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: &ClientMessage);
}

/// Observability hook that receives the live event log after every change.
pub trait EventLogHook: Send + Sync {
    fn on_event_log(&self, entries: &[Arc<Event>]);
}

/// Read-only mirror of the event log for inspection.
#[derive(Clone)]
pub struct DebugMirror {
    entries: Arc<ArcSwap<Vec<Arc<Event>>>>,
}

impl DebugMirror {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// The log as last seen, newest first.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Event>>> {
        self.entries.load_full()
    }
}

impl EventLogHook for DebugMirror {
    fn on_event_log(&self, entries: &[Arc<Event>]) {
        self.entries.store(Arc::new(entries.to_vec()));
    }
}

impl Default for DebugMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DebugMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugMirror")
            .field("entries", &self.entries.load().len())
            .finish()
    }
}

// ── ConnectionManager ────────────────────────────────────────────────

/// Owns at most one live event channel.
pub struct ConnectionManager {
    ws_url: Url,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    handle: OnceLock<Arc<WebSocketHandle>>,
    event_log: EventLog,
    hook: Option<Arc<dyn EventLogHook>>,
    hook_subscription: OnceLock<Subscription>,
}

impl ConnectionManager {
    /// Create a manager. Nothing is spawned until [`connect`](Self::connect).
    pub fn new(
        ws_url: Url,
        reconnect: ReconnectConfig,
        event_log: EventLog,
        hook: Option<Arc<dyn EventLogHook>>,
    ) -> Self {
        Self {
            ws_url,
            reconnect,
            cancel: CancellationToken::new(),
            handle: OnceLock::new(),
            event_log,
            hook,
            hook_subscription: OnceLock::new(),
        }
    }

    /// The channel address.
    pub fn url(&self) -> &Url {
        &self.ws_url
    }

    /// Open the channel, or return the one already open.
    ///
    /// Must be called from within a tokio runtime. Concurrent callers all
    /// receive the same handle; exactly one transport is spawned.
    pub fn connect(&self) -> Arc<WebSocketHandle> {
        let handle = self.handle.get_or_init(|| {
            info!(url = %self.ws_url, "opening event channel");
            self.install_hook();
            Arc::new(WebSocketHandle::spawn(
                self.ws_url.clone(),
                self.reconnect.clone(),
                self.cancel.child_token(),
            ))
        });
        Arc::clone(handle)
    }

    /// The open channel, if [`connect`](Self::connect) has been called.
    pub fn handle(&self) -> Option<Arc<WebSocketHandle>> {
        self.handle.get().cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.handle
            .get()
            .is_some_and(|h| h.link_state() == LinkState::Connected)
    }

    /// Inbound event stream, connecting first if needed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.connect().subscribe()
    }

    /// Link state changes of the open channel.
    pub fn link_state(&self) -> Option<watch::Receiver<LinkState>> {
        self.handle.get().map(|h| h.state())
    }

    /// Stop the background transport. The handle stays in place but will
    /// drop every further send.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn install_hook(&self) {
        let Some(hook) = self.hook.clone() else {
            return;
        };
        let sub = self
            .event_log
            .subscribe(move |entries| hook.on_event_log(entries));
        if self.hook_subscription.set(sub).is_err() {
            warn!("event log hook already installed");
        }
    }
}

impl MessageSink for ConnectionManager {
    fn send(&self, message: &ClientMessage) {
        let Some(handle) = self.handle.get() else {
            debug!(kind = message.kind(), "dropping message, channel never opened");
            return;
        };

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, kind = message.kind(), "failed to encode message");
                return;
            }
        };

        if handle.send_text(text) {
            debug!(kind = message.kind(), "message sent");
        } else {
            debug!(kind = message.kind(), "dropping message, channel reconnecting");
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("ws_url", &self.ws_url.as_str())
            .field("open", &self.handle.get().is_some())
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}
