//! Clap derive structures for the `bisecure` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bisecure -- drive BiSecure garage doors and gates from the command line
#[derive(Debug, Parser)]
#[command(
    name = "bisecure",
    version,
    about = "Drive BiSecure garage doors and gates from the command line",
    long_about = "Polls the doors behind a BiSecure gateway and translates\n\
        open/close/stop commands into gateway impulses.\n\n\
        Runs against the built-in simulated gateway.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "BISECURE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "BISECURE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BISECURE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the groups (doors and gates) behind the gateway
    #[command(alias = "g")]
    Groups,

    /// Show the current channel values of actuators
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Stream channel updates as they are published
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Send a command to a door
    Send(SendArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Actuator commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Groups to show (all discovered groups when omitted)
    #[arg(long, short = 'g')]
    pub group: Vec<u32>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Groups to watch (all discovered groups when omitted)
    #[arg(long, short = 'g')]
    pub group: Vec<u32>,

    /// Stop after this many seconds (runs until Ctrl-C when omitted)
    #[arg(long = "for", value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Target group
    #[arg(long, short = 'g')]
    pub group: u32,

    /// Target port (first impulse port of the group when omitted)
    #[arg(long)]
    pub port: Option<u8>,

    /// Keep reporting channel updates for this many seconds afterwards
    #[arg(long, value_name = "SECS", default_value = "0")]
    pub follow: u64,

    /// Command to send
    #[arg(value_enum)]
    pub command: DoorCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DoorCommand {
    Open,
    Close,
    Stop,
    /// Toggle: start a stopped door, stop a moving one
    Move,
    /// Re-read the door state without actuating
    Refresh,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration (passwords masked)
    Show,

    /// Print the config file path
    Path,

    /// Add or replace a gateway profile
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Gateway id (the MAC printed on the device)
    #[arg(long)]
    pub gateway_id: String,

    /// Gateway IP address
    #[arg(long)]
    pub address: String,

    /// Gateway user
    #[arg(long)]
    pub username: Option<String>,

    /// Environment variable holding the gateway password
    #[arg(long)]
    pub password_env: Option<String>,

    /// Make this the default profile
    #[arg(long)]
    pub set_default: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
