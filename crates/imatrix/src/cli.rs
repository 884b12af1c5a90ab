//! Clap derive structures for the `imatrix` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// imatrix -- bridge iMatrix IoT telemetry to your terminal
#[derive(Debug, Parser)]
#[command(
    name = "imatrix",
    version,
    about = "Inspect and watch iMatrix IoT telemetry from the command line",
    long_about = "Logs in to an iMatrix account, discovers its things and sensor\n\
        channels, and exposes each channel as a typed entity with unit-aware\n\
        rounding. `watch` keeps every entity polling until interrupted.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "IMATRIX_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account email (overrides profile)
    #[arg(long, short = 'e', env = "IMATRIX_EMAIL", global = true)]
    pub email: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "IMATRIX_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IMATRIX_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates even if the profile verifies them
    #[arg(long, short = 'k', env = "IMATRIX_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "IMATRIX_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
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
    /// Check that the account credentials are accepted
    Login,

    /// List things registered under the account
    #[command(alias = "t")]
    Things,

    /// Discover entities and show their current values
    #[command(alias = "e")]
    Entities(EntitiesArgs),

    /// Keep every entity polling and print value changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Entities ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Only show entities of this thing (serial number)
    #[arg(long)]
    pub thing: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between polls of each entity (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Only print changes for this thing (serial number)
    #[arg(long)]
    pub thing: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Store the account password in the system keyring
    SetPassword {
        /// Profile to store it for (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
