//! Clap derive structures for the `usbwatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Kept
//! free of workspace-crate imports so `build.rs` can include it for man
//! page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// usbwatch -- track USB devices as they come and go
#[derive(Debug, Parser)]
#[command(
    name = "usbwatch",
    version,
    about = "Detect and track USB devices from the command line",
    long_about = "Detects attached USB devices through libusb hotplug events, libusb\n\
        enumeration, or platform commands (lsusb, system_profiler, wmic),\n\
        tracks their connect/disconnect lifecycle, and resolves mounted\n\
        storage volumes.",
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
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "USBWATCH_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the configured one, else table)
    #[arg(long, short = 'o', env = "USBWATCH_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Preferred detection strategy (used only when available)
    #[arg(long, short = 's', env = "USBWATCH_STRATEGY", global = true)]
    pub strategy: Option<StrategyArg>,
}

// ── Value Enums ──────────────────────────────────────────────────────

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// libusb hotplug events
    NativeEvent,
    /// libusb enumeration, polled
    NativePoll,
    /// Platform listing command, polled
    CommandPoll,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect attached devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show recent connect/disconnect events
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Show detection strategy and engine status
    Status,

    /// Resolve the mount path of a storage device
    Mount(MountArgs),

    /// Stream lifecycle events until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List attached devices
    #[command(alias = "ls")]
    List {
        /// Reprint the list whenever a device connects or disconnects
        #[arg(long, short = 'f')]
        follow: bool,
    },

    /// Show one device
    Get {
        /// Device id (as printed by `devices list`)
        id: String,
    },
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Number of entries to show, newest first
    #[arg(long, short = 'l', default_value = "50")]
    pub limit: usize,
}

// ── Mount ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MountArgs {
    /// Device id of a mass-storage device
    pub id: String,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print the attached devices before streaming events
    #[arg(long)]
    pub initial: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
