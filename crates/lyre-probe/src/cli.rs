//! Command-line interface for the probe.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Aligned, human-readable lines.
    #[default]
    Human,
    /// One JSON document (or one JSON line per event for `watch`).
    Json,
}

/// Inspect and exercise Lyre plugins without a running voice client.
#[derive(Parser, Debug)]
#[command(name = "lyre-probe", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
    /// The action to perform.
    #[command(subcommand)]
    pub(crate) command: ProbeCommand,
}

/// Probe actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ProbeCommand {
    /// Scans the plugin directories and lists every plugin found.
    List,
    /// Lists the running processes offered to positional data plugins.
    Processes,
    /// Runs positional data ticks and reports provider changes and poses.
    Watch {
        /// Stops after this many ticks; runs until interrupted otherwise.
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Validates a plugin library and copies it into the user plugin
    /// directory.
    Install {
        /// Library to install.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}
