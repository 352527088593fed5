// ── Reactive data stores ──
//
// Observable containers for the catalog, the settings map and the event
// log, bundled into one `Stores` value shared by the sync engine, the
// vote protocol and consumers.

mod event_log;
mod observable;
mod refresh;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

pub use event_log::{DEFAULT_EVENT_LOG_CAPACITY, EventLog};
pub use observable::{Observable, Subscription};

use crate::model::{Catalog, Event, SettingsMap};

/// Holds the current catalog snapshot.
pub type CatalogStore = Observable<Catalog>;

/// Holds the current settings map.
pub type SettingsStore = Observable<SettingsMap>;

/// Every piece of client-side state the sync layer maintains.
pub struct Stores {
    pub catalog: CatalogStore,
    pub settings: SettingsStore,
    pub event_log: EventLog,
    pub(crate) last_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl Stores {
    /// Empty stores with an event log of `event_log_capacity` entries.
    pub fn new(event_log_capacity: usize) -> Self {
        let (last_refresh, _) = watch::channel(None);
        let (last_event, _) = watch::channel(None);

        Self {
            catalog: CatalogStore::default(),
            settings: SettingsStore::default(),
            event_log: EventLog::new(event_log_capacity),
            last_refresh,
            last_event,
        }
    }

    /// Log an inbound event and stamp its arrival time.
    pub(crate) fn record_event(&self, event: Arc<Event>) {
        self.event_log.push(event);
        self.last_event.send_replace(Some(Utc::now()));
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        *self.last_event.borrow()
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}
