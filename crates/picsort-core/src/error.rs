// ── Core error types ──
//
// User-facing errors from picsort-core. Consumers never see reqwest or
// serde errors directly; the `From<picsort_api::Error>` impl folds
// wire-layer failures into the sync layer's taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Session is not connected")]
    NotConnected,

    #[error("Server request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    /// The catalog refetch failed or returned malformed data.
    #[error("Catalog fetch failed: {reason}")]
    FetchFailed {
        reason: String,
        /// HTTP status code (if the server answered at all).
        status: Option<u16>,
    },

    /// An inbound or outbound message did not match the wire protocol.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for failures of the catalog refetch collaborator.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::Timeout)
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<picsort_api::Error> for CoreError {
    fn from(err: picsort_api::Error) -> Self {
        match err {
            picsort_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::FetchFailed {
                        reason: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            picsort_api::Error::Http { status, body } => CoreError::FetchFailed {
                reason: if body.is_empty() {
                    format!("server returned HTTP {status}")
                } else {
                    format!("server returned HTTP {status}: {body}")
                },
                status: Some(status),
            },
            picsort_api::Error::Deserialization { message, body: _ } => CoreError::FetchFailed {
                reason: format!("malformed catalog payload: {message}"),
                status: None,
            },
            picsort_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            picsort_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            picsort_api::Error::Encode(e) => CoreError::Protocol {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failure_maps_to_fetch_error() {
        let err = CoreError::from(picsort_api::Error::Http {
            status: 502,
            body: String::new(),
        });
        assert!(err.is_fetch_error());
        assert!(matches!(err, CoreError::FetchFailed { status: Some(502), .. }));
    }

    #[test]
    fn malformed_body_maps_to_fetch_error() {
        let err = CoreError::from(picsort_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(err.is_fetch_error());
        assert!(err.to_string().contains("malformed catalog payload"));
    }

    #[test]
    fn channel_failure_is_not_a_fetch_error() {
        let err = CoreError::from(picsort_api::Error::WebSocketConnect("refused".into()));
        assert!(!err.is_fetch_error());
    }
}
