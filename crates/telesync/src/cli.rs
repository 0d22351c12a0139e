//! Clap derive structures for the `telesync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// telesync -- live telemetry from the command line
#[derive(Debug, Parser)]
#[command(
    name = "telesync",
    version,
    about = "Pull, watch and export solar-car telemetry",
    long_about = "Keeps a cached four-channel telemetry snapshot (battery, motor, MPPT,\n\
        vehicle) in sync with a telemetry backend: pulls over HTTP, applies pushed\n\
        updates while live, and retries failed pulls with a linear backoff.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "TELESYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Telemetry backend URL (overrides profile)
    #[arg(long, short = 's', env = "TELESYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Push channel URL (defaults to ws[s]://<server>/ws)
    #[arg(long, env = "TELESYNC_PUSH_URL", global = true)]
    pub push_url: Option<String>,

    /// Output format [default: table, or `defaults.output` from config]
    #[arg(long, short = 'o', env = "TELESYNC_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: auto, or `defaults.color` from config]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "TELESYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TELESYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    pub fn output_format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
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
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Pull one snapshot and print it
    #[command(alias = "f")]
    Fetch(FetchArgs),

    /// Keep the snapshot in sync and print status changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Pull a snapshot and write battery/motor rows as CSV
    Export(ExportArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync commands ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Rows per channel (1-1000, defaults to the profile limit)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Rows per channel (1-1000, defaults to the profile limit)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: Option<u32>,

    /// Start paused: pushed updates are ignored until resumed with `p`
    #[arg(long)]
    pub paused: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Rows per channel (1-1000, defaults to the profile limit)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: Option<u32>,

    /// Write to this file instead of stdout
    #[arg(long, short = 'f')]
    pub out: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile in the config file
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Telemetry backend URL for the profile
    #[arg(long = "url", default_value = "http://localhost:5000")]
    pub url: String,

    /// Replace an existing profile with the same name
    #[arg(long)]
    pub force: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
