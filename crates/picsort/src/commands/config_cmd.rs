//! Config subcommand handlers.

use picsort_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

fn invalid(field: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value
        .parse()
        .map_err(|_| invalid(key, &format!("must be {expected}")))
}

/// Apply `key = value` to `cfg`.
fn apply(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "server" => cfg.server = value,
        "timeout" => cfg.timeout = parse(key, &value, "a number (seconds)")?,
        "insecure" => cfg.insecure = parse(key, &value, "'true' or 'false'")?,
        "random" => cfg.random = parse(key, &value, "'true' or 'false'")?,
        "event_log_capacity" | "event-log-capacity" => {
            cfg.event_log_capacity = parse(key, &value, "a positive number")?;
        }
        "output" => {
            if !matches!(value.as_str(), "table" | "json" | "json-compact" | "plain") {
                return Err(invalid(key, "must be 'table', 'json', 'json-compact' or 'plain'"));
            }
            cfg.output = value;
        }
        "reconnect.initial_delay_ms" => {
            cfg.reconnect.initial_delay_ms = parse(key, &value, "a number (milliseconds)")?;
        }
        "reconnect.max_delay_ms" => {
            cfg.reconnect.max_delay_ms = parse(key, &value, "a number (milliseconds)")?;
        }
        "reconnect.max_retries" => {
            cfg.reconnect.max_retries = if value == "none" {
                None
            } else {
                Some(parse(key, &value, "a number or 'none'")?)
            };
        }
        other => {
            return Err(invalid(
                other,
                &format!(
                    "unknown config key '{other}'. Valid keys: server, timeout, insecure, \
                     random, event_log_capacity, output, reconnect.initial_delay_ms, \
                     reconnect.max_delay_ms, reconnect.max_retries"
                ),
            ));
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let format = config::output_format(global, &cfg);
            let out = output::render_single(
                format,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# unrenderable: {e}")),
                |c| c.server.clone(),
            )?;
            output::print_output(out.trim_end(), global.quiet);
            if format == OutputFormat::Table && !global.quiet {
                eprintln!("# from {}", config::config_path(global).display());
            }
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let path = config::config_path(global);
            let mut cfg = config::load(global)?;
            apply(&mut cfg, &key, value)?;
            // Refuse to write a file that would fail to load next time.
            cfg.to_session_config()?;
            picsort_config::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("✓ Set {key} in {}", path.display());
            }
            Ok(())
        }
    }
}
