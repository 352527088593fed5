// ── Event classification ──
//
// Inbound discriminators map onto a closed set of kinds, and each kind onto
// the store action it drives. Anything not in the table is logged only.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use picsort_api::Event;

/// Inbound event kinds the sync layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    RateSuccess,
    HideSuccess,
    RestoreSuccess,
    UpdateSettings,
}

/// What the sync engine does with an event after logging it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Refetch the catalog and replace both stores.
    RefreshCatalog,
    /// Replace the settings map with the event's `settings` payload.
    ReplaceSettings,
    /// Nothing beyond the event log.
    LogOnly,
}

impl EventKind {
    /// Look up a wire discriminator. `None` for anything unrecognized.
    pub fn classify(discriminator: &str) -> Option<Self> {
        discriminator.parse().ok()
    }

    pub const fn action(self) -> SyncAction {
        match self {
            Self::RateSuccess | Self::HideSuccess | Self::RestoreSuccess => {
                SyncAction::RefreshCatalog
            }
            Self::UpdateSettings => SyncAction::ReplaceSettings,
        }
    }
}

impl SyncAction {
    pub fn for_event(event: &Event) -> Self {
        EventKind::classify(&event.event).map_or(Self::LogOnly, EventKind::action)
    }
}
