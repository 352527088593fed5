use thiserror::Error;

/// Top-level error type for the `picsort-api` crate.
///
/// Covers every failure mode of the wire layer: HTTP transport, catalog
/// payload decoding, and the WebSocket channel. `picsort-core` maps these
/// into user-facing variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered with a non-success status.
    #[error("Server returned HTTP {status}")]
    Http { status: u16, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed or dropped with an error.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// An outbound message could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Http {
            status: 404,
            body: "missing".into(),
        };
        assert!(!err.is_transient());
    }
}
