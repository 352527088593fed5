// ── Runtime session configuration ──
//
// These types describe *how* to reach a pics-sorter server. They never
// touch disk; the CLI (via picsort-config) builds a `SessionConfig` and
// hands it in.

use std::time::Duration;

use picsort_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

use crate::store::DEFAULT_EVENT_LOG_CAPACITY;

/// Server root used when nothing else is configured.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8000/";

/// TLS verification strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Configuration for one session against one server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server root (e.g. `http://127.0.0.1:8000`). The catalog endpoint and
    /// the event channel address are both derived from it.
    pub server: Url,
    /// TLS verification strategy for `https`/`wss` servers.
    pub tls: TlsVerification,
    /// Catalog request timeout.
    pub timeout: Duration,
    /// Backoff policy for the event channel.
    pub reconnect: ReconnectConfig,
    /// Maximum number of entries kept in the event log.
    pub event_log_capacity: usize,
    /// `is_random` flag for the initial catalog load.
    pub random: bool,
}

impl SessionConfig {
    /// Config for `server` with every other field at its default.
    pub fn for_server(server: Url) -> Self {
        Self {
            server,
            ..Self::default()
        }
    }

    /// Transport settings for the catalog HTTP client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server: Url::parse(DEFAULT_SERVER).expect("DEFAULT_SERVER is a valid URL"),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            random: false,
        }
    }
}
