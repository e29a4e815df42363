//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. Foreign errors are wrapped in
//! `Arc` to satisfy the `result_large_err` Clippy lint and keep the enum
//! cheap to clone into logs.
//!
//! Plugins are identified by their *origin*: the library path for plugins
//! loaded from disk, or the registered name for built-in plugins.

use std::path::PathBuf;
use std::sync::Arc;

use lyre_plugin_abi::{PluginId, Version};
use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The dynamic library could not be loaded.
    #[error("failed to load plugin library {path}: {source}")]
    Load {
        /// Library path.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: Arc<libloading::Error>,
    },

    /// The library loaded but is not a usable plugin.
    #[error("plugin '{origin}' is invalid: {reason}")]
    Invalid {
        /// Library path or built-in name.
        origin: String,
        /// Why the plugin was rejected.
        reason: String,
    },

    /// A mandatory entry point is not exported.
    #[error("plugin '{origin}' does not export mandatory symbol '{symbol}'")]
    MissingSymbol {
        /// Library path or built-in name.
        origin: String,
        /// Name of the first missing symbol.
        symbol: &'static str,
    },

    /// A legacy plugin's struct carries the wrong magic number.
    #[error("legacy plugin '{origin}' has magic {found:#010x}, expected {expected:#010x}")]
    LegacyMagicMismatch {
        /// Library path or built-in name.
        origin: String,
        /// Magic number found in the struct.
        found: u32,
        /// Magic number the host accepts.
        expected: u32,
    },

    /// A legacy plugin withdrew itself by using the retracted short name.
    #[error("legacy plugin '{origin}' has been retracted by its author")]
    Retracted {
        /// Library path or built-in name.
        origin: String,
    },

    /// The host does not offer the API version a plugin asked for.
    #[error("plugin API version {version} is not supported")]
    UnsupportedApiVersion {
        /// Requested version.
        version: Version,
    },

    /// No plugin with the given ID is registered.
    #[error("plugin {id} not found in registry")]
    NotFound {
        /// Requested plugin ID.
        id: PluginId,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A plugin file could not be installed.
    #[error("cannot install plugin {path}: {message}")]
    Install {
        /// Candidate plugin file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

impl PluginError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
