// picsort-core: Client-side sync layer between picsort-api and consumers (CLI).

pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;
pub mod sync;
pub mod vote;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_SERVER, SessionConfig, TlsVerification};
pub use connection::{ConnectionManager, DebugMirror, EventLogHook, MessageSink};
pub use error::CoreError;
pub use session::Session;
pub use store::{
    CatalogStore, DEFAULT_EVENT_LOG_CAPACITY, EventLog, Observable, SettingsStore, Stores,
    Subscription,
};
pub use stream::StoreStream;
pub use sync::{Applied, CatalogSource, SyncEngine};
pub use vote::VoteProtocol;

// Re-export model and link types at the crate root for ergonomics.
pub use model::{Catalog, ClientMessage, Event, EventKind, Item, SettingValue, SettingsMap, SyncAction};
pub use picsort_api::{LinkState, ReconnectConfig};
