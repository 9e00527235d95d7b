//! CLI argument definitions using clap derive

use crate::gate::GatePolicy;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// querykit - query cache and account energy gate toolkit
///
/// Inspect text helpers, replay energy gate scenarios and manage the
/// query cache defaults.
#[derive(Parser, Debug)]
#[command(name = "querykit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "QUERYKIT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a text helper on the given input
    Text(TextArgs),

    /// Replay address/energy steps against an energy gate
    Gate(GateArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the text command
#[derive(Parser, Debug)]
pub struct TextArgs {
    #[command(subcommand)]
    pub action: TextAction,
}

/// Text helpers
#[derive(Subcommand, Debug)]
pub enum TextAction {
    /// Truncate text, omission included
    Truncate {
        text: String,

        /// Maximum length in characters
        #[arg(short, long, default_value_t = 30)]
        length: usize,
    },

    /// Report whether text is emoji-only and how many emoji it holds
    Emoji {
        text: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Collapse repeated whitespace
    Clean { text: String },

    /// Check that text starts with an integer
    Number { text: String },

    /// Check that text looks like an e-mail address
    Email { text: String },
}

/// Arguments for the gate command
#[derive(Parser, Debug)]
pub struct GateArgs {
    /// Starting address
    #[arg(short, long, default_value = "anonymous")]
    pub address: String,

    /// Starting energy
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub energy: f64,

    /// Override the configured gate policy
    #[arg(long, value_enum)]
    pub policy: Option<GatePolicy>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Steps to apply in order: addr:<id> or energy:<number>
    pub steps: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., query.stale_time_ms)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
