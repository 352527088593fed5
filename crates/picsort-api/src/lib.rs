// picsort-api: Async wire client for the pics-sorter server (catalog fetch + event channel)

pub mod catalog;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod websocket;

pub use catalog::CatalogClient;
pub use error::Error;
pub use protocol::{CatalogResponse, ClientMessage, Event, Item, SettingValue, SettingsMap};
pub use transport::{TlsMode, TransportConfig, channel_url};
pub use websocket::{LinkState, ReconnectConfig, WebSocketHandle};
