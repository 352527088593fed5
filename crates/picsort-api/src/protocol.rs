//! Wire types shared by the catalog endpoint and the event channel.
//!
//! Inbound frames are kept loosely typed ([`Event`]): the discriminator is a
//! plain string and every other field lands in `payload`, so frames from a
//! newer server are never rejected. Outbound frames are a closed set
//! ([`ClientMessage`]) serialized with an internal `event` tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Catalog ──────────────────────────────────────────────────────────

/// One image in the server-owned catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identity, relative to the server's picture root.
    pub path: String,

    /// Display URL for the image.
    pub link: String,

    #[serde(default)]
    pub id: i64,

    /// Preference score. Older servers call it `elo_rating`.
    #[serde(default, alias = "elo_rating")]
    pub rating: f64,

    #[serde(default)]
    pub extra_count: i64,
}

/// A single server-defined setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Setting name to value. Keys are defined by the server.
pub type SettingsMap = BTreeMap<String, SettingValue>;

/// Body of `GET /api/pics/`.
///
/// Current servers send `settings`; the earlier protocol variant sends
/// `same_orientation` instead. Both are optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub images: Vec<Item>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_orientation: Option<i64>,
}

// ── Inbound events ───────────────────────────────────────────────────

/// A decoded frame from the event channel.
///
/// Frames without an `event` field (such as the server's greeting) decode
/// with an empty discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Discriminator, e.g. `"rate_success"` or `"update_settings"`.
    #[serde(default)]
    pub event: String,

    /// Every other field the server sent.
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: serde_json::Map::new(),
        }
    }

    /// Builder-style payload field, mostly for tests and fixtures.
    pub fn with(mut self, key: &str, value: serde_json::Value) -> Self {
        self.payload.insert(key.to_owned(), value);
        self
    }

    /// The `is_random` refresh flag carried by result events. Absent means `false`.
    pub fn is_random(&self) -> bool {
        self.payload
            .get("is_random")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Decode the `settings` object of an `update_settings` event.
    pub fn settings(&self) -> Result<SettingsMap, serde_json::Error> {
        let raw = self
            .payload
            .get("settings")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(raw)
    }
}

// ── Outbound messages ────────────────────────────────────────────────

/// Messages the client sends over the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Pairwise preference: `winner` beat every path in `losers`.
    Rate {
        winner: String,
        losers: Vec<String>,
        is_random: bool,
    },
    /// Ask the server to flip a boolean setting.
    ToggleSetting { name: String },
}

impl ClientMessage {
    /// Wire discriminator of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rate { .. } => "rate",
            Self::ToggleSetting { .. } => "toggle_setting",
        }
    }
}
