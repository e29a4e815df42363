//! A loaded native plugin.
//!
//! [`Plugin`] owns the symbol source of one plugin (a dynamic library or a
//! built-in symbol table), the entry points resolved from it, and the
//! lifecycle flags the host tracks. Both ABI generations sit behind the same
//! type: the current ABI as an [`EntryPoints`] table, the legacy ABI as a
//! [`LegacyAdapter`]. Every operation falls back to a documented default
//! when the plugin does not export the matching entry point.
//!
//! # Locking
//!
//! All mutable state lives in one `RwLock`. Queries and event forwards take
//! the read lock; lifecycle transitions take the write lock. Methods that hold
//! the write lock operate on the guarded state directly and never call back
//! into a locking accessor, so the lock never needs to be reentrant.

use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lyre_plugin_abi::{
    ChannelId, ConnectionId, ErrorCode, HostApi, PluginFeatures, PluginId, PositionalDataCode,
    TalkingState, UserId, Version,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::legacy::LegacyAdapter;
use crate::positional::PositionalData;
use crate::process::ProcessInfo;
use crate::resolver::{LibraryResolver, SymbolResolver};

mod entry_points;
mod ids;

pub(crate) use self::entry_points::EntryPoints;
pub use self::ids::PluginIdAllocator;

/// Tracing target for plugin lifecycle operations.
const PLUGIN_TARGET: &str = "lyre_plugins::plugin";

/// Values reported for metadata a plugin does not export.
pub mod defaults {
    use lyre_plugin_abi::{PluginFeatures, Version};

    /// Name of a plugin without `getName` output.
    pub const NAME: &str = "Unknown plugin";
    /// Author of a plugin without `getAuthor`.
    pub const AUTHOR: &str = "Unknown";
    /// Description of a plugin without `getDescription`.
    pub const DESCRIPTION: &str = "No description provided";
    /// Version of a plugin without `getVersion`.
    pub const VERSION: Version = Version::ZERO;
    /// API version of a plugin that cannot report one.
    pub const API_VERSION: Version = Version::UNKNOWN;
    /// Features of a plugin without `getPluginFeatures`.
    pub const FEATURES: PluginFeatures = PluginFeatures::NONE;
}

/// Returns the host version passed to `setMumbleInfo`.
#[must_use]
pub fn host_version() -> Version {
    Version::new(
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    )
}

/// ABI generation a plugin is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiGeneration {
    /// One exported function per capability.
    Current,
    /// Factory functions returning static structs.
    Legacy,
}

impl fmt::Display for AbiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// Where a plugin's symbols come from.
pub enum PluginSource {
    /// A dynamic library on disk.
    Library(PathBuf),
    /// A symbol table compiled into the host.
    BuiltIn(Box<dyn SymbolResolver>),
}

impl fmt::Debug for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library(path) => f.debug_tuple("Library").field(path).finish(),
            Self::BuiltIn(resolver) => f.debug_tuple("BuiltIn").field(&resolver.origin()).finish(),
        }
    }
}

enum Backend {
    Unresolved,
    Current(EntryPoints),
    Legacy(LegacyAdapter),
}

struct PluginState {
    valid: bool,
    loaded: bool,
    positional_enabled: bool,
    positional_active: bool,
    backend: Backend,
}

impl PluginState {
    /// Calls the plugin's positional shutdown and clears the active flag.
    fn stop_positional(&mut self) {
        if !self.positional_active {
            return;
        }
        match &self.backend {
            Backend::Current(entries) => {
                if let Some(shutdown) = entries.shutdown_positional_data {
                    // SAFETY: resolved with the declared signature.
                    unsafe { shutdown() };
                }
            }
            Backend::Legacy(adapter) => adapter.shutdown_positional_data(),
            Backend::Unresolved => {}
        }
        self.positional_active = false;
    }
}

/// Serializable summary of a plugin, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// Registry ID.
    pub id: PluginId,
    /// Display name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Plugin API version the plugin targets.
    pub api_version: String,
    /// Author.
    pub author: String,
    /// Description.
    pub description: String,
    /// Library path, `None` for built-ins.
    pub path: Option<PathBuf>,
    /// ABI generation.
    pub generation: AbiGeneration,
    /// Whether the plugin is compiled into the host.
    pub built_in: bool,
    /// Whether `init` has run.
    pub loaded: bool,
    /// Advertised features.
    pub features: String,
    /// Whether the plugin may be offered positional data.
    pub positional_data_enabled: bool,
    /// Whether the plugin currently provides positional data.
    pub positional_data_active: bool,
}

/// One native plugin.
pub struct Plugin {
    id: PluginId,
    generation: AbiGeneration,
    built_in: bool,
    origin: String,
    state: RwLock<PluginState>,
    // Declared last: entry points borrowed from the library must be dropped
    // (and `shutdown` must have run) before the library is unloaded.
    resolver: Box<dyn SymbolResolver>,
}

impl Plugin {
    /// Loads and validates the plugin library at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] when the library cannot be loaded and a
    /// validation error when it is not a plugin of the requested generation.
    pub fn load(
        path: impl Into<PathBuf>,
        generation: AbiGeneration,
        ids: &PluginIdAllocator,
    ) -> Result<Self, PluginError> {
        Self::create(PluginSource::Library(path.into()), generation, ids)
    }

    /// Validates a plugin whose symbols are compiled into the host.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the table is not a plugin of the
    /// requested generation.
    pub fn built_in(
        resolver: Box<dyn SymbolResolver>,
        generation: AbiGeneration,
        ids: &PluginIdAllocator,
    ) -> Result<Self, PluginError> {
        Self::create(PluginSource::BuiltIn(resolver), generation, ids)
    }

    /// Builds a plugin from `source` and validates it.
    ///
    /// The ID is taken from `ids` only once the source is available, so a
    /// library that fails to load consumes no ID. A plugin that fails
    /// validation is dropped (unloading its library) before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// See [`Plugin::load`].
    pub fn create(
        source: PluginSource,
        generation: AbiGeneration,
        ids: &PluginIdAllocator,
    ) -> Result<Self, PluginError> {
        let (resolver, built_in): (Box<dyn SymbolResolver>, bool) = match source {
            PluginSource::Library(path) => (Box::new(LibraryResolver::open(path)?), false),
            PluginSource::BuiltIn(resolver) => (resolver, true),
        };
        let plugin = Self::construct(resolver, generation, built_in, ids.allocate());
        plugin.initialize()?;
        Ok(plugin)
    }

    fn construct(
        resolver: Box<dyn SymbolResolver>,
        generation: AbiGeneration,
        built_in: bool,
        id: PluginId,
    ) -> Self {
        Self {
            id,
            generation,
            built_in,
            origin: resolver.origin(),
            state: RwLock::new(PluginState {
                valid: false,
                loaded: false,
                positional_enabled: false,
                positional_active: false,
                backend: Backend::Unresolved,
            }),
            resolver,
        }
    }

    /// Resolves entry points and decides validity.
    ///
    /// A missing mandatory entry point makes the plugin invalid and stops
    /// before any optional entry point is looked up.
    fn initialize(&self) -> Result<(), PluginError> {
        let mut state = self.write_state();
        let resolver: &dyn SymbolResolver = self.resolver.as_ref();
        let resolved = match self.generation {
            AbiGeneration::Current => EntryPoints::resolve_mandatory(resolver)
                .map_err(|symbol| PluginError::MissingSymbol {
                    origin: self.origin.clone(),
                    symbol,
                })
                .map(|mut entries| {
                    entries.resolve_optional(resolver);
                    if entries.enforce_positional_group() {
                        debug!(
                            target: PLUGIN_TARGET,
                            plugin_id = self.id,
                            origin = %self.origin,
                            "ignoring incomplete positional data entry points"
                        );
                    }
                    Backend::Current(entries)
                }),
            AbiGeneration::Legacy => LegacyAdapter::resolve(resolver).map(Backend::Legacy),
        };

        match resolved {
            Ok(backend) => {
                state.backend = backend;
                state.valid = true;
                debug!(
                    target: PLUGIN_TARGET,
                    plugin_id = self.id,
                    origin = %self.origin,
                    generation = %self.generation,
                    "plugin validated"
                );
                Ok(())
            }
            Err(error) => {
                state.valid = false;
                Err(error)
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, PluginState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PluginState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `call` against the current-ABI entry points, or returns
    /// `default` when the plugin is legacy or `call` finds no entry point.
    fn call_or<R>(&self, default: R, call: impl FnOnce(&EntryPoints) -> Option<R>) -> R {
        let state = self.read_state();
        match &state.backend {
            Backend::Current(entries) => call(entries).unwrap_or(default),
            Backend::Legacy(_) | Backend::Unresolved => default,
        }
    }

    // -----------------------------------------------------------------
    // Identity and state
    // -----------------------------------------------------------------

    /// Registry ID.
    #[must_use]
    pub const fn id(&self) -> PluginId {
        self.id
    }

    /// ABI generation.
    #[must_use]
    pub const fn generation(&self) -> AbiGeneration {
        self.generation
    }

    /// Whether the plugin is compiled into the host.
    #[must_use]
    pub const fn is_built_in(&self) -> bool {
        self.built_in
    }

    /// Library path, `None` for built-ins.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.resolver.path()
    }

    /// Library path or built-in name.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Whether the plugin passed validation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.read_state().valid
    }

    /// Whether `init` has run without a matching `shutdown`.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.read_state().loaded
    }

    /// Whether the plugin may be offered positional data.
    #[must_use]
    pub fn is_positional_data_enabled(&self) -> bool {
        self.read_state().positional_enabled
    }

    /// Whether the plugin currently provides positional data.
    #[must_use]
    pub fn is_positional_data_active(&self) -> bool {
        self.read_state().positional_active
    }

    /// Allows or forbids offering positional data to the plugin. Disabling an
    /// active provider shuts its positional data down.
    ///
    /// Only loaded plugins can be enabled; enabling an unloaded plugin is
    /// ignored.
    pub fn enable_positional_data(&self, enable: bool) {
        let mut state = self.write_state();
        if enable && !state.loaded {
            debug!(
                target: PLUGIN_TARGET,
                plugin_id = self.id,
                "ignoring positional data enable for unloaded plugin"
            );
            return;
        }
        state.positional_enabled = enable;
        if !enable {
            state.stop_positional();
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Loads the plugin: passes host information, calls `init`, and hands
    /// the plugin its ID.
    ///
    /// Idempotent: a loaded plugin returns [`ErrorCode::OK`] without calling
    /// anything. An invalid plugin is never loaded and returns
    /// [`ErrorCode::GENERIC_ERROR`].
    pub fn init(&self) -> ErrorCode {
        let mut state = self.write_state();
        if !state.valid {
            warn!(target: PLUGIN_TARGET, plugin_id = self.id, "refusing to load invalid plugin");
            return ErrorCode::GENERIC_ERROR;
        }
        if state.loaded {
            return ErrorCode::OK;
        }
        state.loaded = true;

        let code = match &state.backend {
            Backend::Current(entries) => {
                if let Some(set_host_info) = entries.set_host_info {
                    // SAFETY: resolved with the declared signature.
                    unsafe {
                        set_host_info(
                            host_version(),
                            Version::PLUGIN_API,
                            Version::MINIMUM_PLUGIN_API,
                        );
                    }
                }
                // SAFETY: as above.
                let code = entries.init.map_or(ErrorCode::OK, |init| unsafe { init() });
                if let Some(register_id) = entries.register_plugin_id {
                    // SAFETY: as above.
                    unsafe { register_id(self.id) };
                }
                code
            }
            Backend::Legacy(_) | Backend::Unresolved => ErrorCode::OK,
        };
        debug!(target: PLUGIN_TARGET, plugin_id = self.id, %code, "plugin initialised");
        code
    }

    /// Unloads the plugin: stops positional data if active, withdraws
    /// positional data permission, then calls `shutdown`. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.write_state();
        if !state.loaded {
            return;
        }
        state.stop_positional();
        state.positional_enabled = false;
        state.loaded = false;
        if let Backend::Current(entries) = &state.backend
            && let Some(shutdown) = entries.shutdown
        {
            // SAFETY: resolved with the declared signature.
            unsafe { shutdown() };
        }
        debug!(target: PLUGIN_TARGET, plugin_id = self.id, "plugin shut down");
    }

    /// Hands the plugin the host API table.
    pub fn register_api_functions(&self, api: &'static HostApi) {
        self.call_or((), |entries| {
            entries.register_api_functions.map(|register| {
                // SAFETY: resolved with the declared signature; the table is
                // static so the plugin may keep the pointer.
                unsafe { register(std::ptr::from_ref(api)) };
            })
        });
    }

    // -----------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        let state = self.read_state();
        match &state.backend {
            Backend::Legacy(adapter) => adapter.name().to_owned(),
            Backend::Current(entries) => entries
                .get_name
                // SAFETY: resolved with the declared signature.
                .and_then(|get_name| unsafe { c_string(get_name()) })
                .unwrap_or_else(|| defaults::NAME.to_owned()),
            Backend::Unresolved => defaults::NAME.to_owned(),
        }
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> String {
        let state = self.read_state();
        match &state.backend {
            Backend::Legacy(adapter) => adapter.description().to_owned(),
            Backend::Current(entries) => entries
                .get_description
                // SAFETY: resolved with the declared signature.
                .and_then(|get_description| unsafe { c_string(get_description()) })
                .unwrap_or_else(|| defaults::DESCRIPTION.to_owned()),
            Backend::Unresolved => defaults::DESCRIPTION.to_owned(),
        }
    }

    /// Author.
    #[must_use]
    pub fn author(&self) -> String {
        self.call_or(None, |entries| {
            // SAFETY: resolved with the declared signature.
            entries.get_author.map(|get_author| unsafe { c_string(get_author()) })
        })
        .unwrap_or_else(|| defaults::AUTHOR.to_owned())
    }

    /// Plugin version. Legacy plugins report their struct revision as the
    /// major component.
    #[must_use]
    pub fn version(&self) -> Version {
        let state = self.read_state();
        match &state.backend {
            Backend::Legacy(adapter) => adapter.version(),
            Backend::Current(entries) => entries
                .get_version
                // SAFETY: resolved with the declared signature.
                .map_or(defaults::VERSION, |get_version| unsafe { get_version() }),
            Backend::Unresolved => defaults::VERSION,
        }
    }

    /// Plugin API version the plugin targets.
    #[must_use]
    pub fn api_version(&self) -> Version {
        self.call_or(defaults::API_VERSION, |entries| {
            // SAFETY: resolved with the declared signature.
            entries.get_api_version.map(|get_api_version| unsafe { get_api_version() })
        })
    }

    /// Advertised features. Legacy plugins only ever provide positional data.
    #[must_use]
    pub fn features(&self) -> PluginFeatures {
        let state = self.read_state();
        match &state.backend {
            Backend::Legacy(_) => PluginFeatures::POSITIONAL,
            Backend::Current(entries) => entries.get_plugin_features.map_or(
                defaults::FEATURES,
                // SAFETY: resolved with the declared signature.
                |get_features| PluginFeatures::from_bits(unsafe { get_features() }),
            ),
            Backend::Unresolved => defaults::FEATURES,
        }
    }

    /// Asks the plugin to switch `requested` features off. Returns the
    /// features that remain active; without the entry point that is
    /// `requested` itself.
    pub fn deactivate_features(&self, requested: PluginFeatures) -> PluginFeatures {
        self.call_or(requested, |entries| {
            entries.deactivate_features.map(|deactivate| {
                // SAFETY: resolved with the declared signature.
                PluginFeatures::from_bits(unsafe { deactivate(requested.bits()) })
            })
        })
    }

    /// Summary for listings.
    #[must_use]
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            id: self.id,
            name: self.name(),
            version: self.version().to_string(),
            api_version: self.api_version().to_string(),
            author: self.author(),
            description: self.description(),
            path: self.file_path().map(Path::to_path_buf),
            generation: self.generation,
            built_in: self.built_in,
            loaded: self.is_loaded(),
            features: self.features().to_string(),
            positional_data_enabled: self.is_positional_data_enabled(),
            positional_data_active: self.is_positional_data_active(),
        }
    }

    // -----------------------------------------------------------------
    // Positional data
    // -----------------------------------------------------------------

    /// Offers the running processes to the plugin.
    ///
    /// A plugin without positional entry points answers
    /// [`PositionalDataCode::ERROR_PERM`]. On [`PositionalDataCode::OK`] the
    /// plugin becomes active.
    pub fn init_positional_data(&self, processes: &[ProcessInfo]) -> PositionalDataCode {
        let mut state = self.write_state();
        let code = match &state.backend {
            Backend::Current(entries) => entries
                .init_positional_data
                .map_or(PositionalDataCode::ERROR_PERM, |init| {
                    offer_processes(init, processes)
                }),
            Backend::Legacy(adapter) => adapter.init_positional_data(processes),
            Backend::Unresolved => PositionalDataCode::ERROR_PERM,
        };
        if code == PositionalDataCode::OK {
            state.positional_active = true;
        }
        debug!(
            target: PLUGIN_TARGET,
            plugin_id = self.id,
            %code,
            processes = processes.len(),
            "offered positional data"
        );
        code
    }

    /// Fills `data` from the plugin. Returns `false` when the plugin wants to
    /// stop providing data.
    ///
    /// A plugin without positional entry points zeroes `data` and returns
    /// `false`. Non-finite vectors are replaced with zero.
    pub fn fetch_positional_data(&self, data: &mut PositionalData) -> bool {
        let state = self.read_state();
        let keep_going = match &state.backend {
            Backend::Current(entries) => match entries.fetch_positional_data {
                Some(fetch) => fetch_current(fetch, data),
                None => {
                    data.reset();
                    false
                }
            },
            Backend::Legacy(adapter) => adapter.fetch_positional_data(data),
            Backend::Unresolved => {
                data.reset();
                false
            }
        };
        let replaced = data.sanitize();
        if replaced > 0 {
            debug!(
                target: PLUGIN_TARGET,
                plugin_id = self.id,
                replaced,
                "discarded non-finite positional vectors"
            );
        }
        keep_going
    }

    /// Stops positional data if the plugin is active.
    pub fn shutdown_positional_data(&self) {
        self.write_state().stop_positional();
    }

    // -----------------------------------------------------------------
    // Dialogs
    // -----------------------------------------------------------------

    /// Whether the plugin has an about dialog.
    #[must_use]
    pub fn provides_about_dialog(&self) -> bool {
        self.legacy_or(false, LegacyAdapter::provides_about_dialog)
    }

    /// Whether the plugin has a configuration dialog.
    #[must_use]
    pub fn provides_config_dialog(&self) -> bool {
        self.legacy_or(false, LegacyAdapter::provides_config_dialog)
    }

    /// Opens the about dialog with a null parent. Returns `false` when there
    /// is none.
    pub fn show_about_dialog(&self) -> bool {
        self.legacy_or(false, |adapter| adapter.show_about_dialog(std::ptr::null_mut::<c_void>()))
    }

    /// Opens the configuration dialog with a null parent. Returns `false`
    /// when there is none.
    pub fn show_config_dialog(&self) -> bool {
        self.legacy_or(false, |adapter| adapter.show_config_dialog(std::ptr::null_mut::<c_void>()))
    }

    fn legacy_or<R>(&self, default: R, call: impl FnOnce(&LegacyAdapter) -> R) -> R {
        let state = self.read_state();
        match &state.backend {
            Backend::Legacy(adapter) => call(adapter),
            Backend::Current(_) | Backend::Unresolved => default,
        }
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    /// Forwards a server connection.
    pub fn on_server_connected(&self, connection: ConnectionId) {
        self.call_or((), |entries| {
            // SAFETY: resolved with the declared signature.
            entries.on_server_connected.map(|callback| unsafe { callback(connection) })
        });
    }

    /// Forwards a server disconnection.
    pub fn on_server_disconnected(&self, connection: ConnectionId) {
        self.call_or((), |entries| {
            // SAFETY: resolved with the declared signature.
            entries.on_server_disconnected.map(|callback| unsafe { callback(connection) })
        });
    }

    /// Forwards a user entering a channel.
    pub fn on_channel_entered(
        &self,
        connection: ConnectionId,
        user: UserId,
        previous_channel: ChannelId,
        new_channel: ChannelId,
    ) {
        self.call_or((), |entries| {
            entries.on_channel_entered.map(|callback| {
                // SAFETY: resolved with the declared signature.
                unsafe { callback(connection, user, previous_channel, new_channel) };
            })
        });
    }

    /// Forwards a user leaving a channel.
    pub fn on_channel_exited(&self, connection: ConnectionId, user: UserId, channel: ChannelId) {
        self.call_or((), |entries| {
            entries.on_channel_exited.map(|callback| {
                // SAFETY: resolved with the declared signature.
                unsafe { callback(connection, user, channel) };
            })
        });
    }

    /// Forwards a talking state change.
    pub fn on_user_talking_state_changed(
        &self,
        connection: ConnectionId,
        user: UserId,
        state: TalkingState,
    ) {
        self.call_or((), |entries| {
            entries.on_user_talking_state_changed.map(|callback| {
                // SAFETY: resolved with the declared signature.
                unsafe { callback(connection, user, state) };
            })
        });
    }

    /// Forwards plugin data sent by another user. Returns `true` when the
    /// plugin handled it.
    pub fn on_receive_data(
        &self,
        connection: ConnectionId,
        sender: UserId,
        data: &[u8],
        data_id: &str,
    ) -> bool {
        let Ok(data_id) = CString::new(data_id) else {
            return false;
        };
        self.call_or(false, |entries| {
            entries.on_receive_data.map(|callback| {
                // SAFETY: resolved with the declared signature; both buffers
                // outlive the call.
                unsafe { callback(connection, sender, data.as_ptr(), data.len(), data_id.as_ptr()) }
            })
        })
    }

    /// Forwards captured microphone samples. Returns `true` when the plugin
    /// modified them.
    pub fn on_audio_input(&self, samples: &mut [i16], channel_count: u16, is_speech: bool) -> bool {
        let Some(frames) = frame_count(samples.len(), channel_count) else {
            return false;
        };
        self.call_or(false, |entries| {
            entries.on_audio_input.map(|callback| {
                // SAFETY: `samples` holds `frames * channel_count` samples.
                unsafe { callback(samples.as_mut_ptr(), frames, channel_count, is_speech) }
            })
        })
    }

    /// Forwards samples fetched for one remote user. Returns `true` when the
    /// plugin modified them.
    pub fn on_audio_source_fetched(
        &self,
        samples: &mut [f32],
        channel_count: u16,
        is_speech: bool,
        user: UserId,
    ) -> bool {
        let Some(frames) = frame_count(samples.len(), channel_count) else {
            return false;
        };
        self.call_or(false, |entries| {
            entries.on_audio_source_fetched.map(|callback| {
                // SAFETY: `samples` holds `frames * channel_count` samples.
                unsafe { callback(samples.as_mut_ptr(), frames, channel_count, is_speech, user) }
            })
        })
    }

    /// Forwards samples of one remote user after host processing. Returns
    /// `true` when the plugin modified them.
    pub fn on_audio_source_processed(
        &self,
        samples: &mut [f32],
        channel_count: u16,
        is_speech: bool,
        user: UserId,
    ) -> bool {
        let Some(frames) = frame_count(samples.len(), channel_count) else {
            return false;
        };
        self.call_or(false, |entries| {
            entries.on_audio_source_processed.map(|callback| {
                // SAFETY: `samples` holds `frames * channel_count` samples.
                unsafe { callback(samples.as_mut_ptr(), frames, channel_count, is_speech, user) }
            })
        })
    }

    /// Forwards the mixed output buffer. Returns `true` when the plugin
    /// modified it.
    pub fn on_audio_output_about_to_play(&self, samples: &mut [f32], channel_count: u16) -> bool {
        let Some(frames) = frame_count(samples.len(), channel_count) else {
            return false;
        };
        self.call_or(false, |entries| {
            entries.on_audio_output_about_to_play.map(|callback| {
                // SAFETY: `samples` holds `frames * channel_count` samples.
                unsafe { callback(samples.as_mut_ptr(), frames, channel_count) }
            })
        })
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        self.shutdown();
        debug!(
            target: PLUGIN_TARGET,
            plugin_id = self.id,
            origin = %self.origin,
            "unloading plugin"
        );
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("generation", &self.generation)
            .field("valid", &state.valid)
            .field("loaded", &state.loaded)
            .field("positional_active", &state.positional_active)
            .finish_non_exhaustive()
    }
}

/// Copies a plugin-owned C string.
///
/// # Safety
///
/// `pointer` must be null or point at a NUL-terminated string.
unsafe fn c_string(pointer: *const c_char) -> Option<String> {
    if pointer.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    Some(unsafe { CStr::from_ptr(pointer) }.to_string_lossy().into_owned())
}

/// Overwrites `target` with a plugin-owned C string, reusing its buffer.
///
/// # Safety
///
/// Same contract as [`c_string`].
unsafe fn copy_c_string(target: &mut String, pointer: *const c_char) {
    target.clear();
    if !pointer.is_null() {
        // SAFETY: non-null and NUL-terminated per the caller.
        target.push_str(&unsafe { CStr::from_ptr(pointer) }.to_string_lossy());
    }
}

/// Number of frames in an interleaved buffer, `None` when it cannot be
/// described to the plugin.
fn frame_count(samples: usize, channel_count: u16) -> Option<u32> {
    let frames = samples.checked_div(usize::from(channel_count))?;
    u32::try_from(frames).ok()
}

fn offer_processes(
    init: lyre_plugin_abi::current::InitPositionalDataFn,
    processes: &[ProcessInfo],
) -> PositionalDataCode {
    let (names, pids): (Vec<CString>, Vec<u64>) = processes
        .iter()
        .filter_map(|process| {
            CString::new(process.name())
                .ok()
                .map(|name| (name, process.pid()))
        })
        .unzip();
    let name_pointers: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
    // SAFETY: both arrays hold `names.len()` elements and outlive the call.
    PositionalDataCode(unsafe { init(name_pointers.as_ptr(), pids.as_ptr(), name_pointers.len()) })
}

fn fetch_current(
    fetch: lyre_plugin_abi::current::FetchPositionalDataFn,
    data: &mut PositionalData,
) -> bool {
    let mut context: *const c_char = std::ptr::null();
    let mut identity: *const c_char = std::ptr::null();
    let [ap, af, at, cp, cf, ct] = data.vectors_mut().map(|vector| vector.as_mut_ptr());
    // SAFETY: each vector pointer addresses three floats; the string
    // out-pointers are valid locals.
    let keep_going = unsafe { fetch(ap, af, at, cp, cf, ct, &raw mut context, &raw mut identity) };
    // SAFETY: the plugin leaves null or points at NUL-terminated strings it
    // owns until its next call.
    unsafe {
        copy_c_string(&mut data.context, context);
        copy_c_string(&mut data.identity, identity);
    }
    keep_going
}
