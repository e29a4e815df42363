//! Error types for the probe runtime.

use std::io;
use std::sync::Arc;

use lyre_plugins::PluginError;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors surfaced while running a probe command.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),
    /// The command line could not be parsed.
    #[error("{0}")]
    CliUsage(Box<clap::Error>),
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// `install` needs a user plugin directory.
    #[error("no user plugin directory is configured; set --user-plugin-dir")]
    MissingUserPluginDir,
    /// A plugin operation failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Results could not be serialised.
    #[error("failed to serialise output: {0}")]
    Serialise(#[from] serde_json::Error),
    /// Results could not be written.
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}
