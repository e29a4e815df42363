use camino::Utf8PathBuf;

use crate::logging::{LogFormat, PluginLogLevel};

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default positional data polling cadence, one audio frame.
pub const DEFAULT_FETCH_INTERVAL_MS: u64 = 20;

/// System-wide plugin directory used when none is configured.
#[cfg(unix)]
pub const DEFAULT_SYSTEM_PLUGIN_DIR: &str = "/usr/lib/lyre/plugins";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default floor for plugin log lines.
#[must_use]
pub const fn default_plugin_log_level() -> PluginLogLevel {
    PluginLogLevel::Info
}

/// Default positional data polling cadence in milliseconds.
#[must_use]
pub const fn default_fetch_interval_ms() -> u64 {
    DEFAULT_FETCH_INTERVAL_MS
}

/// Computes the default system plugin directory, if the platform has one.
#[must_use]
pub fn default_system_plugin_dir() -> Option<Utf8PathBuf> {
    default_system_plugin_dir_inner()
}

#[cfg(unix)]
fn default_system_plugin_dir_inner() -> Option<Utf8PathBuf> {
    Some(Utf8PathBuf::from(DEFAULT_SYSTEM_PLUGIN_DIR))
}

#[cfg(not(unix))]
fn default_system_plugin_dir_inner() -> Option<Utf8PathBuf> {
    dirs::data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .map(|base| base.join("Lyre").join("plugins"))
}

/// Computes the default per-user plugin directory below the platform's data
/// directory.
#[must_use]
pub fn default_user_plugin_dir() -> Option<Utf8PathBuf> {
    dirs::data_local_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .map(|base| base.join("lyre").join("plugins"))
}
