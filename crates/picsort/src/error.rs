//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use picsort_config::ConfigError;
use picsort_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const PROTOCOL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the server at {url}")]
    #[diagnostic(
        code(picsort::connection_failed),
        help(
            "Check that the pics-sorter server is running and accessible.\n\
             URL: {url}\n\
             Set it with: picsort --server <URL> or picsort config set server <URL>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Event channel to {url} did not come up within {seconds}s")]
    #[diagnostic(
        code(picsort::not_connected),
        help("The catalog loaded but the live channel at /ws is not answering.")
    )]
    NotConnected { url: String, seconds: u64 },

    // ── Server data ──────────────────────────────────────────────────
    #[error("Catalog request to {url} failed: {reason}")]
    #[diagnostic(
        code(picsort::fetch_failed),
        help("Check that the pics-sorter server is running and serves /api/pics/.")
    )]
    FetchFailed { url: String, reason: String },

    #[error("Unexpected message from server: {message}")]
    #[diagnostic(code(picsort::protocol))]
    Protocol { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    #[diagnostic(
        code(picsort::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64, waiting_for: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(picsort::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration could not be loaded from {path}")]
    #[diagnostic(
        code(picsort::config),
        help("Fix or remove the file. `picsort config path` prints its location.")
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(picsort::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(picsort::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected { .. } | Self::FetchFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            Self::Protocol { .. } => exit_code::PROTOCOL,
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in the server address and timeout that core errors lack.
    pub fn in_context(self, server: &str, seconds: u64) -> Self {
        match self {
            Self::ConnectionFailed { url, source } if url.is_empty() => Self::ConnectionFailed {
                url: server.to_owned(),
                source,
            },
            Self::NotConnected { .. } => Self::NotConnected {
                url: server.to_owned(),
                seconds,
            },
            Self::FetchFailed { reason, .. } => Self::FetchFailed {
                url: server.to_owned(),
                reason,
            },
            Self::Timeout { waiting_for, .. } => Self::Timeout {
                seconds,
                waiting_for,
            },
            other => other,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                path: picsort_config::config_path().display().to_string(),
                source: other,
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::NotConnected => CliError::NotConnected {
                url: String::new(),
                seconds: 0,
            },

            CoreError::Timeout => CliError::Timeout {
                seconds: 0,
                waiting_for: "the catalog".into(),
            },

            CoreError::FetchFailed { reason, status: _ } => CliError::FetchFailed {
                url: String::new(),
                reason,
            },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
