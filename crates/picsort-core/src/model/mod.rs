// ── Domain model ──
//
// Wire types are re-exported from picsort-api unchanged; the catalog
// snapshot and event classification are defined here.

mod catalog;
mod event;

pub use catalog::Catalog;
pub use event::{EventKind, SyncAction};
pub use picsort_api::{ClientMessage, Event, Item, SettingValue, SettingsMap};
