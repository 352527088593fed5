//! Watch command: follow the live event channel and the stores it drives.

use chrono::{Local, SecondsFormat};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use picsort_core::{Event, SyncAction};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util::Ctx;

/// One line of watch output.
#[derive(serde::Serialize)]
struct WatchLine<'a> {
    at: String,
    #[serde(flatten)]
    event: &'a Event,
}

fn describe(event: &Event, color: bool) -> String {
    let name = output::paint_event(&event.event, color);
    match SyncAction::for_event(event) {
        SyncAction::RefreshCatalog => {
            let random = if event.is_random() { " (random)" } else { "" };
            format!("{name}{random} -> refetching catalog")
        }
        SyncAction::ReplaceSettings => match event.settings() {
            Ok(settings) => {
                let pairs: Vec<String> = settings.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{name} -> {}", pairs.join(", "))
            }
            Err(e) => format!("{name} -> ignored, bad settings payload: {e}"),
        },
        SyncAction::LogOnly => {
            let payload = serde_json::Value::Object(event.payload.clone());
            format!("{name} {payload}")
        }
    }
}

fn render_event(ctx: &Ctx, event: &Event) -> Result<String, CliError> {
    let at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let line = WatchLine { at, event };
    match ctx.format {
        OutputFormat::Table => Ok(format!("{}  {}", line.at, describe(event, ctx.color))),
        OutputFormat::Plain => Ok(event.event.clone()),
        // One event per line, even for `--output json`.
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(&line)?),
    }
}

pub async fn handle(ctx: &Ctx, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut events = ctx.session.events();
    ctx.session.connect().await.map_err(|e| ctx.fail(e))?;

    if ctx.format == OutputFormat::Table && !global.quiet {
        eprintln!(
            "watching {} ({} items), Ctrl-C to stop",
            ctx.session.connection().url(),
            ctx.session.catalog().len()
        );
    }

    let mut catalog = ctx.session.catalog_stream();
    let mut seen = 0usize;

    loop {
        if args.count.is_some_and(|n| seen >= n) {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            recv = events.recv() => match recv {
                Ok(event) => {
                    seen += 1;
                    output::print_output(&render_event(ctx, &event)?, global.quiet);
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "watch fell behind"),
                Err(RecvError::Closed) => break,
            },
            Some(snapshot) = catalog.changed() => {
                if ctx.format == OutputFormat::Table && !global.quiet {
                    let at = ctx
                        .session
                        .stores()
                        .last_refresh()
                        .map(|t| t.with_timezone(&Local).format(" at %H:%M:%S").to_string())
                        .unwrap_or_default();
                    eprintln!("catalog refreshed{at}: {} items", snapshot.len());
                }
            }
        }
    }

    ctx.session.disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn result_events_announce_a_refetch() {
        let event = Event::new("rate_success").with("is_random", json!(true));
        assert_eq!(
            describe(&event, false),
            "rate_success (random) -> refetching catalog"
        );
    }

    #[test]
    fn settings_events_list_the_new_values() {
        let event = Event::new("update_settings").with("settings", json!({"same_orientation": false}));
        assert_eq!(describe(&event, false), "update_settings -> same_orientation=false");
    }

    #[test]
    fn unknown_events_show_their_payload() {
        let event = Event::new("").with("type", json!("echo"));
        assert_eq!(describe(&event, false), r#"(untyped) {"type":"echo"}"#);
    }
}
