//! Shared configuration for picsort tools.
//!
//! A single TOML file merged over built-in defaults and `PICSORT_`
//! environment variables, translated to `picsort_core::SessionConfig`.
//! The CLI layers its flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use picsort_core::{
    DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_SERVER, ReconnectConfig, SessionConfig, TlsVerification,
};

/// Environment variable prefix. Nested keys use a double underscore,
/// e.g. `PICSORT_RECONNECT__MAX_DELAY_MS`.
pub const ENV_PREFIX: &str = "PICSORT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Server root URL.
    #[serde(default = "default_server")]
    pub server: String,

    /// Catalog request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Entries kept in the event log.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// `is_random` flag for the initial catalog load.
    #[serde(default)]
    pub random: bool,

    /// Default output format: "table" or "json".
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            timeout: default_timeout(),
            insecure: false,
            event_log_capacity: default_event_log_capacity(),
            random: false,
            output: default_output(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

/// Event channel backoff, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Give up after this many failed attempts. Absent means never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: None,
        }
    }
}

fn default_server() -> String {
    DEFAULT_SERVER.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}
fn default_output() -> String {
    "table".into()
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "picsort", "picsort").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("picsort");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if present), then environment.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` and the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Parse and validate the server URL.
    pub fn server_url(&self) -> Result<url::Url, ConfigError> {
        let url: url::Url = self.server.parse().map_err(|e| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL '{}': {e}", self.server),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("expected an http or https URL, got scheme '{other}'"),
            }),
        }
    }

    /// Build a `SessionConfig` from this file config.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        let server = self.server_url()?;

        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(ConfigError::Validation {
                field: "reconnect.initial_delay_ms".into(),
                reason: format!(
                    "{} exceeds max_delay_ms ({})",
                    self.reconnect.initial_delay_ms, self.reconnect.max_delay_ms
                ),
            });
        }

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(SessionConfig {
            server,
            tls,
            timeout: Duration::from_secs(self.timeout),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                max_retries: self.reconnect.max_retries,
            },
            event_log_capacity: self.event_log_capacity,
            random: self.random,
        })
    }
}
