//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file, used only when present.
pub const DEFAULT_CONFIG_PATH: &str = "hookprobe.toml";

/// hookprobe -- integration suite and load driver for webhook receivers.
///
/// Use `hookprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "hookprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the hookprobe.toml configuration file.
    ///
    /// When omitted, ./hookprobe.toml is used if it exists, built-in
    /// defaults (plus environment overrides) otherwise.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the integration scenarios against the receiver.
    Integration(IntegrationArgs),

    /// Drive load against the receiver.
    Load(LoadArgs),

    /// Inspect the scenario table.
    Scenarios(ScenariosArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- integration ----

/// Post every scenario, check responses and side effects.
#[derive(Args, Debug)]
pub struct IntegrationArgs {
    /// Run only the named scenario (repeatable).
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

// ---- load ----

/// Drive a staged virtual-user ramp.
#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(subcommand)]
    pub action: LoadAction,
}

#[derive(Subcommand, Debug)]
pub enum LoadAction {
    /// Run the ramp and evaluate thresholds.
    Run {
        /// Override the target URL from the configuration.
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the resolved ramp without sending traffic.
    Plan,
}

// ---- scenarios ----

/// Inspect the scenario table.
#[derive(Args, Debug)]
pub struct ScenariosArgs {
    #[command(subcommand)]
    pub action: ScenariosAction,
}

#[derive(Subcommand, Debug)]
pub enum ScenariosAction {
    /// List scenarios in run order.
    List {
        /// Also print payloads and expected records.
        #[arg(short, long)]
        verbose: bool,
    },
}

// ---- config ----

/// Manage hookprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, integration, verify, load, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
