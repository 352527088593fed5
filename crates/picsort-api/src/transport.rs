// Shared transport configuration for building reqwest::Client instances.
//
// The catalog client and the channel URL derivation both start from the
// configured server root, so the helpers for that live here too.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// TLS verification mode for HTTPS servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Accept any certificate (self-signed development servers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("picsort/", env!("CARGO_PKG_VERSION")));

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(Error::Transport)
    }
}

/// Derive the event channel address from the server root.
///
/// `http://host:port/...` becomes `ws://host:port/ws`; `https` maps to `wss`.
/// Any path on the server URL is ignored, the channel always lives at `/ws`.
pub fn channel_url(server: &Url) -> Result<Url, Error> {
    let scheme = match server.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let host = server
        .host_str()
        .ok_or_else(|| Error::WebSocketConnect(format!("server URL has no host: {server}")))?;
    let authority = match server.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    Ok(Url::parse(&format!("{scheme}://{authority}/ws"))?)
}
