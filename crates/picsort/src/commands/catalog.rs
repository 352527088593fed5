//! Catalog command handler and shared catalog/settings renderers.

use std::cell::Cell;
use std::fmt::Write as _;

use tabled::Tabled;

use picsort_core::{Catalog, Item, SettingValue, SettingsMap};

use crate::cli::{CatalogArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::Ctx;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Extra")]
    extra: i64,
    #[tabled(rename = "ID")]
    id: i64,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(serde::Serialize)]
struct SettingEntry<'a> {
    name: &'a str,
    value: &'a SettingValue,
}

// ── Renderers ───────────────────────────────────────────────────────

pub fn render_catalog(format: OutputFormat, catalog: &Catalog) -> Result<String, CliError> {
    let position = Cell::new(0);
    let out = output::render_list(
        format,
        &catalog.items,
        |item: &Item| {
            position.set(position.get() + 1);
            ItemRow {
                position: position.get(),
                path: item.path.clone(),
                rating: format!("{:.1}", item.rating),
                extra: item.extra_count,
                id: item.id,
            }
        },
        |item| item.path.clone(),
    )?;

    if format == OutputFormat::Table && catalog.is_empty() {
        return Ok("(catalog is empty)".into());
    }
    Ok(out)
}

pub fn render_settings(format: OutputFormat, settings: &SettingsMap) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(format, settings, |_| String::new(), |_| String::new())
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let entries: Vec<SettingEntry<'_>> = settings
                .iter()
                .map(|(name, value)| SettingEntry { name, value })
                .collect();
            output::render_list(
                format,
                &entries,
                |e| SettingRow {
                    name: e.name.to_owned(),
                    value: e.value.to_string(),
                },
                |e| format!("{}={}", e.name, e.value),
            )
        }
    }
}

fn summary(catalog: &Catalog, settings: &SettingsMap) -> String {
    let mut line = format!("{} items", catalog.len());
    if let Some(flag) = catalog.same_orientation {
        let _ = write!(line, ", same_orientation={flag}");
    }
    for (name, value) in settings {
        let _ = write!(line, ", {name}={value}");
    }
    line
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx, args: CatalogArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.session
        .refresh(args.random)
        .await
        .map_err(|e| ctx.fail(e))?;

    let catalog = ctx.session.catalog();
    let settings = ctx.session.settings();

    let out = if args.settings {
        render_settings(ctx.format, &settings)?
    } else {
        render_catalog(ctx.format, &catalog)?
    };
    output::print_output(&out, global.quiet);

    if ctx.format == OutputFormat::Table && !args.settings && !global.quiet {
        eprintln!("{}", summary(&catalog, &settings));
    }
    Ok(())
}
