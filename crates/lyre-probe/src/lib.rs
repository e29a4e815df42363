//! Operator tool for the Lyre plugin host.
//!
//! The probe loads configuration through `lyre-config`, installs structured
//! telemetry, and then runs one command against a [`PluginRegistry`]:
//! listing plugins, listing the processes positional data plugins would be
//! offered, watching positional data ticks, or installing a plugin library.
//! Configuration loading, the process table, and built-in plugins are all
//! injectable so the runtime can be exercised from tests.
//!
//! [`PluginRegistry`]: lyre_plugins::PluginRegistry

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod environment;
mod errors;
mod health;
mod telemetry;

use cli::{Cli, ProbeCommand};
use commands::WatchSchedule;
use config::split_config_arguments;
pub use config::{ConfigLoader, OrthoConfigLoader, StaticConfigLoader};
pub use environment::{HostEnvironment, SystemEnvironment, build_registry, plugin_directories};
pub use errors::ProbeError;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

use lyre_config::Config;
use lyre_plugins::PluginRegistry;

/// Runs the probe with the system collaborators.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    ProbeRunner::new(&OrthoConfigLoader, &SystemEnvironment).run(args, stdout, stderr)
}

/// Probe runtime with substitutable collaborators.
pub struct ProbeRunner<'a> {
    loader: &'a dyn ConfigLoader,
    environment: &'a dyn HostEnvironment,
    reporter: Arc<dyn HealthReporter>,
}

impl<'a> ProbeRunner<'a> {
    /// Creates a runner reporting health through `tracing`.
    #[must_use]
    pub fn new(loader: &'a dyn ConfigLoader, environment: &'a dyn HostEnvironment) -> Self {
        Self {
            loader,
            environment,
            reporter: Arc::new(StructuredHealthReporter),
        }
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Parses `args`, runs the selected command, and maps the outcome to an
    /// exit code. Errors are written to `stderr`.
    #[must_use]
    pub fn run<I, W, E>(&self, args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        W: Write,
        E: Write,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let cli = match Cli::try_parse_from(&split.command_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                let _ = write!(stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                let _ = write!(stderr, "{error}");
                return ExitCode::FAILURE;
            }
        };

        match self.execute(&cli, &split.config_arguments, stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                self.reporter.probe_failed(&error);
                let _ = writeln!(stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute<W: Write>(
        &self,
        cli: &Cli,
        config_arguments: &[OsString],
        stdout: &mut W,
    ) -> Result<(), ProbeError> {
        self.reporter.bootstrap_starting();
        let config = self
            .loader
            .load(config_arguments)
            .map_err(ProbeError::LoadConfiguration)?;
        telemetry::initialise(&config)?;
        self.reporter.bootstrap_succeeded(&config);

        match &cli.command {
            ProbeCommand::List => {
                let registry = self.scanned_registry(&config);
                commands::list_plugins(&registry, cli.output, stdout)
            }
            ProbeCommand::Processes => commands::list_processes(
                self.environment.process_source().as_ref(),
                cli.output,
                stdout,
            ),
            ProbeCommand::Watch { ticks } => {
                let registry = self.scanned_registry(&config);
                let schedule = WatchSchedule {
                    ticks: *ticks,
                    interval: config.fetch_interval(),
                };
                commands::watch_positional_data(&registry, schedule, cli.output, stdout)
            }
            ProbeCommand::Install { path } => {
                let directory = config
                    .user_plugin_dir()
                    .ok_or(ProbeError::MissingUserPluginDir)?;
                commands::install_plugin(directory.as_std_path(), path, cli.output, stdout)
            }
        }
    }

    fn scanned_registry(&self, config: &Config) -> PluginRegistry {
        let registry = build_registry(config, self.environment);
        let count = registry.rescan_plugins();
        self.reporter.plugins_scanned(count);
        registry
    }
}

#[cfg(test)]
mod tests;
