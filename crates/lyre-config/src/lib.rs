//! Layered configuration for the Lyre plugin host.
//!
//! Values are merged from built-in defaults, a `.lyre.toml` configuration
//! file (or the file named by `--config-path` / `LYRE_CONFIG_PATH`),
//! `LYRE_*` environment variables, and finally command-line flags.

mod defaults;
mod logging;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use self::defaults::{
    DEFAULT_FETCH_INTERVAL_MS, DEFAULT_LOG_FILTER, default_fetch_interval_ms, default_log_filter,
    default_log_filter_string, default_log_format, default_plugin_log_level,
    default_system_plugin_dir, default_user_plugin_dir,
};
pub use self::logging::{LogFormat, LogFormatParseError, PluginLogLevel};

/// Flags consumed by the configuration loader rather than by subcommands.
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--system-plugin-dir",
    "--user-plugin-dir",
    "--log-filter",
    "--log-format",
    "--plugin-log-level",
    "--fetch-interval-ms",
    "--disable-positional-data",
];

/// Configuration flags that never take a separate value.
pub const CONFIG_CLI_SWITCHES: &[&str] = &["--disable-positional-data"];

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LYRE")]
pub struct Config {
    /// Directory holding plugins shipped with the host.
    #[serde(default = "default_system_plugin_dir")]
    pub system_plugin_dir: Option<Utf8PathBuf>,
    /// Directory holding plugins installed by the user.
    #[serde(default = "default_user_plugin_dir")]
    pub user_plugin_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Lowest level of plugin log lines shown, whatever `log_filter` says.
    #[serde(default = "default_plugin_log_level")]
    pub plugin_log_level: PluginLogLevel,
    /// Milliseconds between positional data ticks.
    #[serde(default = "default_fetch_interval_ms")]
    pub fetch_interval_ms: u64,
    /// Stops freshly loaded plugins from providing positional data.
    #[serde(default)]
    pub disable_positional_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system_plugin_dir: default_system_plugin_dir(),
            user_plugin_dir: default_user_plugin_dir(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            plugin_log_level: default_plugin_log_level(),
            fetch_interval_ms: default_fetch_interval_ms(),
            disable_positional_data: false,
        }
    }
}

impl Config {
    /// System plugin directory, if any.
    #[must_use]
    pub fn system_plugin_dir(&self) -> Option<&Utf8PathBuf> {
        self.system_plugin_dir.as_ref()
    }

    /// User plugin directory, if any. Plugins are installed here.
    #[must_use]
    pub fn user_plugin_dir(&self) -> Option<&Utf8PathBuf> {
        self.user_plugin_dir.as_ref()
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Level applied to plugin log lines.
    #[must_use]
    pub const fn plugin_log_level(&self) -> PluginLogLevel {
        self.plugin_log_level
    }

    /// Interval between positional data ticks. Never shorter than one
    /// millisecond.
    #[must_use]
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms.max(1))
    }

    /// Default positional data permission for loaded plugins.
    #[must_use]
    pub const fn positional_data_enabled(&self) -> bool {
        !self.disable_positional_data
    }
}

#[cfg(test)]
mod tests;
