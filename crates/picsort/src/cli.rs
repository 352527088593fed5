//! Clap derive structures for the `picsort` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// picsort -- drive and observe a pics-sorter session from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "picsort",
    version,
    about = "Browse, rank and watch a pics-sorter image catalog",
    long_about = "A command-line client for a pics-sorter server.\n\n\
        Loads the image catalog over HTTP and follows the server's live\n\
        event channel to keep it current while votes come in.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server URL (overrides the config file)
    #[arg(long, short = 's', env = "PICSORT_SERVER", global = true)]
    pub server: Option<String>,

    /// Path to an alternative config file
    #[arg(long, env = "PICSORT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current catalog and settings
    #[command(alias = "ls")]
    Catalog(CatalogArgs),

    /// Follow the live event channel
    Watch(WatchArgs),

    /// Vote for one image over every other image in the catalog
    Vote(VoteArgs),

    /// Flip a boolean server setting
    Toggle(ToggleArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session Commands ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Ask the server for a random selection
    #[arg(long, short = 'r')]
    pub random: bool,

    /// Show settings instead of items
    #[arg(long)]
    pub settings: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct VoteArgs {
    /// Path of the winning image
    pub winner: String,

    /// Mark the vote as cast on a random selection
    #[arg(long, short = 'r')]
    pub random: bool,

    /// Return as soon as the vote is sent, without waiting for the result
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Setting name (e.g. "same_orientation")
    pub name: String,

    /// Return as soon as the request is sent, without waiting for the update
    #[arg(long)]
    pub no_wait: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value
    Set {
        /// Config key (e.g. "server" or "reconnect.max_delay_ms")
        key: String,

        /// Value to set
        value: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
