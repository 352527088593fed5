// ── Session ──
//
// Owns every piece of a client's sync state for its whole lifetime: the
// stores, the connection manager, the sync engine and the vote protocol.
// Collaborators are injected at construction; nothing is global.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use picsort_api::{CatalogClient, LinkState, channel_url};

use crate::config::SessionConfig;
use crate::connection::{ConnectionManager, EventLogHook};
use crate::error::CoreError;
use crate::model::{Catalog, ClientMessage, Event, SettingsMap};
use crate::store::{CatalogStore, EventLog, SettingsStore, Stores};
use crate::stream::StoreStream;
use crate::sync::{CatalogSource, SyncEngine};
use crate::vote::VoteProtocol;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Create one per server and
/// keep it for as long as the client runs.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    stores: Arc<Stores>,
    connection: Arc<ConnectionManager>,
    engine: SyncEngine,
    votes: VoteProtocol,
    cancel: CancellationToken,
    engine_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session that fetches the catalog over HTTP. Does NOT
    /// connect: call [`connect()`](Self::connect) to open the event channel.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let client = CatalogClient::new(config.server.clone(), &config.transport())?;
        Self::with_collaborators(config, Arc::new(client), None)
    }

    /// Create a session with an explicit catalog source and an optional
    /// event log hook.
    pub fn with_collaborators(
        config: SessionConfig,
        source: Arc<dyn CatalogSource>,
        hook: Option<Arc<dyn EventLogHook>>,
    ) -> Result<Self, CoreError> {
        let ws_url = channel_url(&config.server)?;
        let stores = Arc::new(Stores::new(config.event_log_capacity));
        let connection = Arc::new(ConnectionManager::new(
            ws_url,
            config.reconnect.clone(),
            stores.event_log.clone(),
            hook,
        ));
        let engine = SyncEngine::new(Arc::clone(&stores), source);
        let votes = VoteProtocol::new(connection.clone(), stores.catalog.clone());

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                stores,
                connection,
                engine,
                votes,
                cancel: CancellationToken::new(),
                engine_task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the event channel, start the sync engine and load the catalog.
    ///
    /// Idempotent: later calls only repeat the catalog load. The channel is
    /// subscribed before the initial fetch so no result event is missed.
    /// Fails with [`CoreError::NotConnected`] after [`disconnect`](Self::disconnect).
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::NotConnected);
        }
        {
            let mut task = self.inner.engine_task.lock().await;
            if task.is_none() {
                let events = self.inner.connection.subscribe();
                let engine = self.inner.engine.clone();
                let cancel = self.inner.cancel.child_token();
                *task = Some(tokio::spawn(engine.run(events, cancel)));
                info!(url = %self.inner.connection.url(), "session started");
            }
        }

        self.refresh(self.inner.config.random).await
    }

    /// Stop the sync engine and close the event channel.
    ///
    /// Terminal: a disconnected session cannot be reconnected. Build a new
    /// one instead.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();
        self.inner.connection.shutdown();

        if let Some(handle) = self.inner.engine_task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "sync engine task ended abnormally");
            }
        }
        debug!("session disconnected");
    }

    /// Refetch the catalog now.
    pub async fn refresh(&self, is_random: bool) -> Result<(), CoreError> {
        self.inner.engine.refresh(is_random).await
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Send a vote for `winner`. Dropped silently while disconnected.
    pub fn vote(&self, winner: &str, is_random: bool) -> ClientMessage {
        self.inner.votes.vote(winner, is_random)
    }

    /// Ask the server to flip the setting `name`. Dropped silently while
    /// disconnected.
    pub fn toggle_setting(&self, name: &str) -> ClientMessage {
        self.inner.votes.toggle_setting(name)
    }

    // ── State observation ────────────────────────────────────────────

    pub fn stores(&self) -> &Arc<Stores> {
        &self.inner.stores
    }

    pub fn catalog_store(&self) -> &CatalogStore {
        &self.inner.stores.catalog
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.inner.stores.settings
    }

    pub fn event_log(&self) -> &EventLog {
        &self.inner.stores.event_log
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.inner.stores.catalog.get()
    }

    pub fn settings(&self) -> Arc<SettingsMap> {
        self.inner.stores.settings.get()
    }

    pub fn catalog_stream(&self) -> StoreStream<Catalog> {
        self.inner.stores.catalog.watch()
    }

    pub fn settings_stream(&self) -> StoreStream<SettingsMap> {
        self.inner.stores.settings.watch()
    }

    /// Raw inbound events, opening the channel if needed.
    pub fn events(&self) -> broadcast::Receiver<Arc<Event>> {
        self.inner.connection.subscribe()
    }

    /// Link state of the event channel, once opened.
    pub fn link_state(&self) -> Option<watch::Receiver<LinkState>> {
        self.inner.connection.link_state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.inner.connection
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.inner.config.server.as_str())
            .field("connection", &self.inner.connection)
            .finish_non_exhaustive()
    }
}
