//! Command dispatch: bridges CLI args -> core Session -> output formatting.

pub mod catalog;
pub mod config_cmd;
pub mod util;
pub mod vote;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

use util::Ctx;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Ctx, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Catalog(args) => catalog::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Vote(args) => vote::handle_vote(ctx, args, global).await,
        Command::Toggle(args) => vote::handle_toggle(ctx, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
