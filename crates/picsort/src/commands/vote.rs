//! Vote and toggle command handlers.
//!
//! Both send one message over the event channel and, unless `--no-wait`,
//! wait for the store the server's reply updates.

use picsort_core::ClientMessage;

use crate::cli::{GlobalOpts, OutputFormat, ToggleArgs, VoteArgs};
use crate::error::CliError;
use crate::output;

use super::catalog::{render_catalog, render_settings};
use super::util::Ctx;

fn detail(message: &ClientMessage) -> String {
    match message {
        ClientMessage::Rate {
            winner,
            losers,
            is_random,
        } => {
            let random = if *is_random { " (random)" } else { "" };
            format!("voted for {winner} over {} others{random}", losers.len())
        }
        ClientMessage::ToggleSetting { name } => format!("requested toggle of {name}"),
    }
}

fn report_sent(ctx: &Ctx, message: &ClientMessage, global: &GlobalOpts) -> Result<(), CliError> {
    if ctx.format == OutputFormat::Table {
        if !global.quiet {
            eprintln!("{}", detail(message));
        }
        return Ok(());
    }
    let out = output::render_single(ctx.format, message, detail, |m| m.kind().to_owned())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_vote(ctx: &Ctx, args: VoteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;

    if !ctx.session.catalog().contains(&args.winner) && !global.quiet {
        eprintln!(
            "warning: '{}' is not in the current catalog, every item counts as a loser",
            args.winner
        );
    }

    let mut catalog = ctx.session.catalog_stream();
    let message = ctx.session.vote(&args.winner, args.random);
    report_sent(ctx, &message, global)?;

    if !args.no_wait {
        let refreshed = ctx
            .within("the catalog refresh", catalog.changed())
            .await?
            .ok_or_else(|| CliError::Internal("catalog store closed".into()))?;
        if ctx.format == OutputFormat::Table {
            output::print_output(&render_catalog(ctx.format, &refreshed)?, global.quiet);
        }
    }

    ctx.session.disconnect().await;
    Ok(())
}

pub async fn handle_toggle(ctx: &Ctx, args: ToggleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;

    if !ctx.session.settings().contains_key(&args.name) && !global.quiet {
        eprintln!("warning: the server has not announced a setting named '{}'", args.name);
    }

    let mut settings = ctx.session.settings_stream();
    let message = ctx.session.toggle_setting(&args.name);
    report_sent(ctx, &message, global)?;

    if !args.no_wait {
        let updated = ctx
            .within("the settings update", settings.changed())
            .await?
            .ok_or_else(|| CliError::Internal("settings store closed".into()))?;
        if ctx.format == OutputFormat::Table {
            output::print_output(&render_settings(ctx.format, &updated)?, global.quiet);
        }
    }

    ctx.session.disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_detail_counts_losers() {
        let message = ClientMessage::Rate {
            winner: "b.jpg".into(),
            losers: vec!["a.jpg".into(), "c.jpg".into()],
            is_random: true,
        };
        assert_eq!(detail(&message), "voted for b.jpg over 2 others (random)");
    }

    #[test]
    fn toggle_detail_names_the_setting() {
        let message = ClientMessage::ToggleSetting {
            name: "same_orientation".into(),
        };
        assert_eq!(detail(&message), "requested toggle of same_orientation");
    }
}
