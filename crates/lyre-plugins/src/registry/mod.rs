//! Registry of loaded plugins.
//!
//! The [`PluginRegistry`] discovers plugin libraries in a system and a user
//! directory, keeps every plugin it could build keyed by ID, drives the
//! positional data tick, and broadcasts host events to loaded plugins.
//!
//! Rescans are destructive: every plugin is dropped (shut down and unloaded)
//! and the directories are read again from scratch.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lyre_plugin_abi::{ChannelId, ConnectionId, ErrorCode, PluginId, TalkingState, UserId};
use tracing::{debug, info, warn};

use crate::arbiter::PositionalDataArbiter;
use crate::error::PluginError;
use crate::host_api::host_api_for;
use crate::plugin::{AbiGeneration, Plugin, PluginIdAllocator};
use crate::positional::PositionalData;
use crate::process::{ProcessSource, SystemProcesses};
use crate::resolver::SymbolResolver;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "lyre_plugins::registry";

/// Directories scanned for plugin libraries. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDirectories {
    /// Directory shared by all users of the machine.
    pub system: Option<PathBuf>,
    /// Directory owned by the current user; plugins are installed here.
    pub user: Option<PathBuf>,
}

impl PluginDirectories {
    /// Creates a pair of directories.
    #[must_use]
    pub const fn new(system: Option<PathBuf>, user: Option<PathBuf>) -> Self {
        Self { system, user }
    }

    fn iter(&self) -> impl Iterator<Item = &Path> {
        [self.system.as_deref(), self.user.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// Builds the symbol table of a built-in plugin.
pub type BuiltInFactory = Box<dyn Fn() -> Box<dyn SymbolResolver> + Send + Sync>;

struct BuiltInPlugin {
    name: String,
    generation: AbiGeneration,
    factory: BuiltInFactory,
}

/// Whether `path` carries the platform's dynamic library extension.
#[must_use]
pub fn is_plugin_library(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| extension.eq_ignore_ascii_case(std::env::consts::DLL_EXTENSION))
}

/// Owns every plugin and the positional data state.
pub struct PluginRegistry {
    directories: PluginDirectories,
    ids: PluginIdAllocator,
    built_ins: Vec<BuiltInPlugin>,
    positional_data_default: bool,
    plugins: RwLock<BTreeMap<PluginId, Arc<Plugin>>>,
    arbiter: PositionalDataArbiter,
    snapshot: RwLock<PositionalData>,
}

impl PluginRegistry {
    /// Creates an empty registry reading the system process table.
    #[must_use]
    pub fn new(directories: PluginDirectories) -> Self {
        Self::with_process_source(directories, Box::new(SystemProcesses))
    }

    /// Creates an empty registry listing processes through `processes`.
    #[must_use]
    pub fn with_process_source(
        directories: PluginDirectories,
        processes: Box<dyn ProcessSource>,
    ) -> Self {
        Self {
            directories,
            ids: PluginIdAllocator::new(),
            built_ins: Vec::new(),
            positional_data_default: true,
            plugins: RwLock::new(BTreeMap::new()),
            arbiter: PositionalDataArbiter::new(processes),
            snapshot: RwLock::new(PositionalData::new()),
        }
    }

    /// Decides whether plugins start out enabled for positional data.
    pub fn set_positional_data_default(&mut self, enabled: bool) {
        self.positional_data_default = enabled;
    }

    /// Adds a plugin compiled into the host. It is instantiated on every
    /// rescan, after the directory plugins.
    pub fn register_built_in(
        &mut self,
        name: impl Into<String>,
        generation: AbiGeneration,
        factory: BuiltInFactory,
    ) {
        self.built_ins.push(BuiltInPlugin {
            name: name.into(),
            generation,
            factory,
        });
    }

    /// Scanned directories.
    #[must_use]
    pub const fn directories(&self) -> &PluginDirectories {
        &self.directories
    }

    fn read_plugins(&self) -> RwLockReadGuard<'_, BTreeMap<PluginId, Arc<Plugin>>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_plugins(&self) -> RwLockWriteGuard<'_, BTreeMap<PluginId, Arc<Plugin>>> {
        self.plugins.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_snapshot(&self) -> RwLockWriteGuard<'_, PositionalData> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------

    /// Drops every plugin and rebuilds the registry from the plugin
    /// directories and the built-in plugins. Returns the number of plugins
    /// registered.
    ///
    /// Each library is tried as a current-ABI plugin, then as a legacy
    /// plugin; a library that is neither is logged once and skipped. Every
    /// registered plugin is then loaded.
    ///
    /// The snapshot lock is held for the whole rescan, so no tick can pick a
    /// provider from the plugins being dropped.
    pub fn rescan_plugins(&self) -> usize {
        let mut snapshot = self.write_snapshot();
        self.arbiter.release();
        let previous = std::mem::take(&mut *self.write_plugins());
        drop(previous);
        snapshot.reset();

        let mut discovered: Vec<Plugin> = self
            .candidate_files()
            .iter()
            .filter_map(|path| self.instantiate(path))
            .collect();
        discovered.extend(self.built_ins.iter().filter_map(|built_in| {
            Plugin::built_in((built_in.factory)(), built_in.generation, &self.ids)
                .inspect_err(|error| {
                    warn!(
                        target: REGISTRY_TARGET,
                        name = %built_in.name,
                        error = %error,
                        "built-in plugin is invalid"
                    );
                })
                .ok()
        }));

        let plugins: Vec<Arc<Plugin>> = discovered.into_iter().map(Arc::new).collect();
        {
            let mut registered = self.write_plugins();
            for plugin in &plugins {
                registered.insert(plugin.id(), Arc::clone(plugin));
            }
        }
        for plugin in &plugins {
            if let Err(error) = self.activate(plugin) {
                warn!(
                    target: REGISTRY_TARGET,
                    plugin_id = plugin.id(),
                    error = %error,
                    "plugin left unloaded"
                );
            }
        }

        drop(snapshot);

        info!(target: REGISTRY_TARGET, count = plugins.len(), "plugin scan complete");
        plugins.len()
    }

    /// Library files in the plugin directories, system directory first,
    /// each directory in path order.
    fn candidate_files(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for directory in self.directories.iter() {
            let mut files = match library_files(directory) {
                Ok(files) => files,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    debug!(
                        target: REGISTRY_TARGET,
                        directory = %directory.display(),
                        "plugin directory does not exist"
                    );
                    continue;
                }
                Err(error) => {
                    warn!(
                        target: REGISTRY_TARGET,
                        directory = %directory.display(),
                        error = %error,
                        "cannot read plugin directory"
                    );
                    continue;
                }
            };
            files.sort();
            candidates.extend(files);
        }
        candidates
    }

    fn instantiate(&self, path: &Path) -> Option<Plugin> {
        let current_error = match Plugin::load(path, AbiGeneration::Current, &self.ids) {
            Ok(plugin) => return Some(plugin),
            Err(error) => error,
        };
        match Plugin::load(path, AbiGeneration::Legacy, &self.ids) {
            Ok(plugin) => Some(plugin),
            Err(legacy_error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    path = %path.display(),
                    current = %current_error,
                    legacy = %legacy_error,
                    "non-plugin library in plugin directory"
                );
                None
            }
        }
    }

    /// Registers the host API (current ABI only) and loads the plugin. A
    /// freshly loaded plugin gets the registry's positional data default; a
    /// plugin whose `init` fails is shut down again.
    fn activate(&self, plugin: &Plugin) -> Result<ErrorCode, PluginError> {
        if plugin.is_loaded() {
            return Ok(ErrorCode::OK);
        }
        if plugin.generation() == AbiGeneration::Current {
            plugin.register_api_functions(host_api_for(plugin.api_version())?);
        }
        let code = plugin.init();
        if code.is_ok() {
            plugin.enable_positional_data(self.positional_data_default);
        } else {
            warn!(
                target: REGISTRY_TARGET,
                plugin_id = plugin.id(),
                %code,
                "plugin failed to initialise"
            );
            plugin.shutdown();
        }
        Ok(code)
    }

    /// Loads plugin `id` if it is not loaded yet. Returns the plugin's
    /// `init` status.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown ID and
    /// [`PluginError::UnsupportedApiVersion`] when the host cannot serve the
    /// plugin's API version.
    pub fn load_plugin(&self, id: PluginId) -> Result<ErrorCode, PluginError> {
        let plugin = self.plugin(id).ok_or(PluginError::NotFound { id })?;
        self.activate(&plugin)
    }

    /// Shuts plugin `id` down, stopping its positional data first. The plugin
    /// is no longer offered positional data until it is loaded again.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for an unknown ID.
    pub fn unload_plugin(&self, id: PluginId) -> Result<(), PluginError> {
        let plugin = self.plugin(id).ok_or(PluginError::NotFound { id })?;
        self.arbiter.release_if(id);
        plugin.shutdown();
        Ok(())
    }

    /// Deliberately inert: fetching plugin updates belongs to the host's
    /// updater, not to this crate. The call only logs that a check was
    /// requested, and it never touches the network or the registered plugins.
    pub fn check_for_plugin_updates(&self) {
        debug!(
            target: REGISTRY_TARGET,
            count = self.len(),
            "plugin update checks are not supported"
        );
    }

    // -----------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------

    /// Plugin with ID `id`.
    #[must_use]
    pub fn plugin(&self, id: PluginId) -> Option<Arc<Plugin>> {
        self.read_plugins().get(&id).cloned()
    }

    /// Every plugin, in ID order or, when `sorted`, by case-insensitive name
    /// with ties kept in ID order.
    #[must_use]
    pub fn plugins(&self, sorted: bool) -> Vec<Arc<Plugin>> {
        let mut plugins: Vec<Arc<Plugin>> = self.read_plugins().values().cloned().collect();
        if sorted {
            plugins.sort_by_cached_key(|plugin| plugin.name().to_lowercase());
        }
        plugins
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_plugins().len()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_plugins().is_empty()
    }

    fn loaded_plugins(&self) -> Vec<Arc<Plugin>> {
        self.read_plugins()
            .values()
            .filter(|plugin| plugin.is_loaded())
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------
    // Positional data
    // -----------------------------------------------------------------

    /// Allows or forbids positional data for plugin `id`. Unknown IDs are
    /// ignored. Disabling the active provider releases it.
    pub fn enable_positional_data_for(&self, id: PluginId, enable: bool) {
        let Some(plugin) = self.plugin(id) else {
            debug!(
                target: REGISTRY_TARGET,
                plugin_id = id,
                "ignoring positional data toggle for unknown plugin"
            );
            return;
        };
        if !enable {
            self.arbiter.release_if(id);
        }
        plugin.enable_positional_data(enable);
    }

    /// Runs one positional data tick. Returns whether the snapshot now holds
    /// fresh data.
    ///
    /// Without a provider, arbitration runs first; if nobody accepts, the
    /// snapshot is zeroed. When the provider asks to stop, its positional
    /// data is shut down, the snapshot is zeroed, and the remaining plugins
    /// are arbitrated at once so the next tick has a provider ready. The
    /// stopped plugin is only reconsidered from the next tick on.
    pub fn fetch_positional_data(&self) -> bool {
        let mut snapshot = self.write_snapshot();
        let provider = self
            .arbiter
            .active()
            .or_else(|| self.arbiter.arbitrate(&self.plugins(false)));
        let Some(provider) = provider else {
            snapshot.reset();
            return false;
        };

        if provider.fetch_positional_data(&mut snapshot) {
            return true;
        }

        info!(
            target: REGISTRY_TARGET,
            plugin_id = provider.id(),
            "positional data provider stopped"
        );
        self.arbiter.release();
        snapshot.reset();
        let remaining: Vec<Arc<Plugin>> = self
            .plugins(false)
            .into_iter()
            .filter(|plugin| plugin.id() != provider.id())
            .collect();
        self.arbiter.arbitrate(&remaining);
        false
    }

    /// Whether a plugin currently provides positional data.
    #[must_use]
    pub fn is_positional_data_available(&self) -> bool {
        self.arbiter.has_active()
    }

    /// Copy of the latest positional snapshot.
    #[must_use]
    pub fn positional_data(&self) -> PositionalData {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Active positional data provider.
    #[must_use]
    pub fn active_positional_data_plugin(&self) -> Option<Arc<Plugin>> {
        self.arbiter.active()
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    /// Tells every loaded plugin about a new server connection.
    pub fn on_server_connected(&self, connection: ConnectionId) {
        for plugin in self.loaded_plugins() {
            plugin.on_server_connected(connection);
        }
    }

    /// Tells every loaded plugin a server connection closed.
    pub fn on_server_disconnected(&self, connection: ConnectionId) {
        for plugin in self.loaded_plugins() {
            plugin.on_server_disconnected(connection);
        }
    }

    /// Tells every loaded plugin a user entered a channel.
    pub fn on_channel_entered(
        &self,
        connection: ConnectionId,
        user: UserId,
        previous_channel: ChannelId,
        new_channel: ChannelId,
    ) {
        for plugin in self.loaded_plugins() {
            plugin.on_channel_entered(connection, user, previous_channel, new_channel);
        }
    }

    /// Tells every loaded plugin a user left a channel.
    pub fn on_channel_exited(&self, connection: ConnectionId, user: UserId, channel: ChannelId) {
        for plugin in self.loaded_plugins() {
            plugin.on_channel_exited(connection, user, channel);
        }
    }

    /// Tells every loaded plugin a user's talking state changed.
    pub fn on_user_talking_state_changed(
        &self,
        connection: ConnectionId,
        user: UserId,
        state: TalkingState,
    ) {
        for plugin in self.loaded_plugins() {
            plugin.on_user_talking_state_changed(connection, user, state);
        }
    }

    /// Offers received plugin data to loaded plugins in ID order until one
    /// handles it. Returns whether any did.
    pub fn on_receive_data(
        &self,
        connection: ConnectionId,
        sender: UserId,
        data: &[u8],
        data_id: &str,
    ) -> bool {
        self.loaded_plugins()
            .iter()
            .any(|plugin| plugin.on_receive_data(connection, sender, data, data_id))
    }

    /// Passes captured samples through every loaded plugin. Returns whether
    /// any plugin modified them.
    pub fn on_audio_input(&self, samples: &mut [i16], channel_count: u16, is_speech: bool) -> bool {
        self.loaded_plugins().iter().fold(false, |modified, plugin| {
            plugin.on_audio_input(samples, channel_count, is_speech) || modified
        })
    }

    /// Passes one user's fetched samples through every loaded plugin.
    /// Returns whether any plugin modified them.
    pub fn on_audio_source_fetched(
        &self,
        samples: &mut [f32],
        channel_count: u16,
        is_speech: bool,
        user: UserId,
    ) -> bool {
        self.loaded_plugins().iter().fold(false, |modified, plugin| {
            plugin.on_audio_source_fetched(samples, channel_count, is_speech, user) || modified
        })
    }

    /// Passes one user's processed samples through every loaded plugin.
    /// Returns whether any plugin modified them.
    pub fn on_audio_source_processed(
        &self,
        samples: &mut [f32],
        channel_count: u16,
        is_speech: bool,
        user: UserId,
    ) -> bool {
        self.loaded_plugins().iter().fold(false, |modified, plugin| {
            plugin.on_audio_source_processed(samples, channel_count, is_speech, user) || modified
        })
    }

    /// Passes the mixed output through every loaded plugin. Returns whether
    /// any plugin modified it.
    pub fn on_audio_output_about_to_play(&self, samples: &mut [f32], channel_count: u16) -> bool {
        self.loaded_plugins().iter().fold(false, |modified, plugin| {
            plugin.on_audio_output_about_to_play(samples, channel_count) || modified
        })
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("directories", &self.directories)
            .field("plugins", &self.len())
            .field("built_ins", &self.built_ins.len())
            .field("arbiter", &self.arbiter)
            .finish_non_exhaustive()
    }
}

/// Regular files with the dynamic library extension directly inside
/// `directory`.
fn library_files(directory: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() && is_plugin_library(&path) {
            files.push(path);
        } else {
            debug!(
                target: REGISTRY_TARGET,
                path = %path.display(),
                "skipping non-library file"
            );
        }
    }
    Ok(files)
}
