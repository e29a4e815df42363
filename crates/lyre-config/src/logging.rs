//! Log output settings.
//!
//! The host's own diagnostics and the lines plugins write through the host
//! API are filtered separately: `log_filter` governs the host, while
//! [`PluginLogLevel`] sets the floor for plugin output so a quiet host filter
//! does not swallow what plugins report.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Single-line text for an operator watching a terminal.
    #[default]
    Compact,
    /// One JSON object per event, for log collectors.
    Json,
}

impl LogFormat {
    /// Whether events carry a timestamp. Terminal output leaves it out.
    #[must_use]
    pub const fn timestamps(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Lowest severity of plugin log lines that reaches the output.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PluginLogLevel {
    /// Plugin output is dropped.
    Off,
    /// Only errors.
    Error,
    /// Warnings and errors.
    Warn,
    /// Everything plugins log through the host API.
    #[default]
    Info,
    /// Includes debug chatter.
    Debug,
    /// Everything.
    Trace,
}

impl PluginLogLevel {
    /// Filter directive applying this level to `target`.
    #[must_use]
    pub fn directive_for(self, target: &str) -> String {
        format!("{target}={self}")
    }
}

/// Errors encountered while parsing a [`LogFormat`] or [`PluginLogLevel`]
/// from text.
pub type LogFormatParseError = strum::ParseError;
