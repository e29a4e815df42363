//! Structured health reporting for probe lifecycle events.

use lyre_config::Config;

use crate::errors::ProbeError;

const HEALTH_TARGET: &str = "lyre_probe::health";

/// Observer trait used to surface lifecycle events to telemetry sinks.
#[cfg_attr(test, mockall::automock)]
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once configuration and telemetry are in place.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when the probe gives up.
    fn probe_failed(&self, error: &ProbeError);

    /// Invoked after a plugin directory scan.
    fn plugins_scanned(&self, count: usize);
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting probe bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            system_plugin_dir = ?config.system_plugin_dir(),
            user_plugin_dir = ?config.user_plugin_dir(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            plugin_log_level = %config.plugin_log_level(),
            "probe bootstrap completed"
        );
    }

    fn probe_failed(&self, error: &ProbeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "probe_failed",
            error = %error,
            "probe failed"
        );
    }

    fn plugins_scanned(&self, count: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "plugins_scanned",
            count,
            "plugin scan completed"
        );
    }
}
