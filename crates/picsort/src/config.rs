//! CLI configuration: file config plus `GlobalOpts` overrides.
//!
//! File loading lives in `picsort-config`; this module layers the
//! command-line flags on top and resolves the effective output format.

use std::path::PathBuf;
use std::time::Duration;

use picsort_config::{Config, ConfigError};
use picsort_core::{SessionConfig, TlsVerification};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// The config file this invocation reads and writes.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(picsort_config::config_path)
}

/// Load the file config (defaults when the file is absent).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    picsort_config::load_config_from(&path).map_err(|e| match e {
        ConfigError::Figment(_) => CliError::Config {
            path: path.display().to_string(),
            source: e,
        },
        other => other.into(),
    })
}

/// Build a `SessionConfig` from the file config and CLI overrides.
pub fn resolve_session_config(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let mut cfg = cfg.clone();
    if let Some(ref server) = global.server {
        cfg.server.clone_from(server);
    }

    let mut session = cfg.to_session_config()?;
    if global.insecure {
        session.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        session.timeout = Duration::from_secs(secs);
    }
    Ok(session)
}

/// `--output` if given, else the config's `output`, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    if let Some(format) = global.output {
        return format;
    }
    match cfg.output.as_str() {
        "json" => OutputFormat::Json,
        "json-compact" | "json_compact" => OutputFormat::JsonCompact,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    }
}
