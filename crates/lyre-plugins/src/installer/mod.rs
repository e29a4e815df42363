//! Installation of plugin files into the user plugin directory.
//!
//! A candidate file is accepted only if it carries the platform's library
//! extension and loads as a plugin under either ABI generation. The probe
//! uses its own ID allocator and drops the plugin again, so it never
//! disturbs the registry. Installing copies the file into the user
//! directory, replacing an older copy; the next rescan picks it up.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PluginError;
use crate::plugin::{AbiGeneration, Plugin, PluginIdAllocator, PluginInfo};
use crate::registry::is_plugin_library;

/// Tracing target for installation.
const INSTALLER_TARGET: &str = "lyre_plugins::installer";

/// Installs plugin libraries into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInstaller {
    directory: PathBuf,
}

/// A validated candidate, ready to be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInstall {
    source: PathBuf,
    directory: PathBuf,
    info: PluginInfo,
}

impl PluginInstaller {
    /// Creates an installer targeting `directory`, normally the user plugin
    /// directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory plugins are installed into.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Validates `candidate` and describes the plugin it contains.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Install`] when the file is missing, is not a
    /// library, or is not a plugin under either ABI generation.
    pub fn inspect(&self, candidate: &Path) -> Result<PreparedInstall, PluginError> {
        if !candidate.is_file() {
            return Err(install_error(candidate, "not a regular file"));
        }
        if !is_plugin_library(candidate) {
            return Err(install_error(
                candidate,
                format!(
                    "expected a .{} plugin library",
                    std::env::consts::DLL_EXTENSION
                ),
            ));
        }

        let probe_ids = PluginIdAllocator::new();
        let plugin = Plugin::load(candidate, AbiGeneration::Current, &probe_ids)
            .or_else(|current_error| {
                Plugin::load(candidate, AbiGeneration::Legacy, &probe_ids).map_err(|legacy_error| {
                    install_error(
                        candidate,
                        format!(
                            "not a plugin (current ABI: {current_error}; legacy ABI: {legacy_error})"
                        ),
                    )
                })
            })?;

        Ok(PreparedInstall {
            source: candidate.to_path_buf(),
            directory: self.directory.clone(),
            info: plugin.info(),
        })
    }

    /// Validates and installs `candidate`. Returns the installed path.
    ///
    /// # Errors
    ///
    /// See [`PluginInstaller::inspect`] and [`PreparedInstall::install`].
    pub fn install(&self, candidate: &Path) -> Result<PathBuf, PluginError> {
        self.inspect(candidate)?.install()
    }
}

impl PreparedInstall {
    /// Description of the validated plugin.
    #[must_use]
    pub const fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// File that will be copied.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Copies the plugin into the installer's directory.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] when the directory cannot be created or
    /// the file cannot be replaced or copied.
    pub fn install(self) -> Result<PathBuf, PluginError> {
        let destination = copy_into(&self.source, &self.directory)?;
        info!(
            target: INSTALLER_TARGET,
            name = %self.info.name,
            path = %destination.display(),
            "plugin installed"
        );
        Ok(destination)
    }
}

/// Copies `source` into `directory`, replacing a file of the same name.
/// Copying a file onto itself is a no-op.
pub(crate) fn copy_into(source: &Path, directory: &Path) -> Result<PathBuf, PluginError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| install_error(source, "path has no file name"))?;
    fs::create_dir_all(directory).map_err(|error| PluginError::io(directory, error))?;
    let destination = directory.join(file_name);

    if let (Ok(from), Ok(to)) = (fs::canonicalize(source), fs::canonicalize(&destination))
        && from == to
    {
        return Ok(destination);
    }
    if destination.exists() {
        fs::remove_file(&destination).map_err(|error| PluginError::io(&destination, error))?;
    }
    fs::copy(source, &destination).map_err(|error| PluginError::io(&destination, error))?;
    Ok(destination)
}

fn install_error(path: &Path, message: impl Into<String>) -> PluginError {
    PluginError::Install {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
