//! Entry points of the current plugin ABI.
//!
//! A plugin exports each capability as a separate unmangled symbol. The
//! five symbols in [`MANDATORY_SYMBOLS`] must all be present for the library
//! to count as a plugin; everything else is optional and the host falls back
//! to a default when it is missing. The three positional-data symbols are
//! all-or-nothing: a plugin exporting only some of them is treated as
//! exporting none.
//!
//! Strings returned by a plugin are NUL-terminated UTF-8 owned by the plugin
//! and must stay valid until the plugin is shut down.

use std::ffi::c_char;

use crate::{ChannelId, ConnectionId, ErrorCode, HostApi, PluginId, TalkingState, UserId, Version};

/// Exported symbol names.
pub mod symbols {
    /// `init`
    pub const INIT: &str = "init";
    /// `shutdown`
    pub const SHUTDOWN: &str = "shutdown";
    /// `getName`
    pub const GET_NAME: &str = "getName";
    /// `getAPIVersion`
    pub const GET_API_VERSION: &str = "getAPIVersion";
    /// `registerAPIFunctions`
    pub const REGISTER_API_FUNCTIONS: &str = "registerAPIFunctions";
    /// `setMumbleInfo`
    pub const SET_MUMBLE_INFO: &str = "setMumbleInfo";
    /// `getVersion`
    pub const GET_VERSION: &str = "getVersion";
    /// `getAuthor`
    pub const GET_AUTHOR: &str = "getAuthor";
    /// `getDescription`
    pub const GET_DESCRIPTION: &str = "getDescription";
    /// `registerPluginID`
    pub const REGISTER_PLUGIN_ID: &str = "registerPluginID";
    /// `getPluginFeatures`
    pub const GET_PLUGIN_FEATURES: &str = "getPluginFeatures";
    /// `deactivateFeatures`
    pub const DEACTIVATE_FEATURES: &str = "deactivateFeatures";
    /// `initPositionalData`
    pub const INIT_POSITIONAL_DATA: &str = "initPositionalData";
    /// `fetchPositionalData`
    pub const FETCH_POSITIONAL_DATA: &str = "fetchPositionalData";
    /// `shutdownPositionalData`
    pub const SHUTDOWN_POSITIONAL_DATA: &str = "shutdownPositionalData";
    /// `onServerConnected`
    pub const ON_SERVER_CONNECTED: &str = "onServerConnected";
    /// `onServerDisconnected`
    pub const ON_SERVER_DISCONNECTED: &str = "onServerDisconnected";
    /// `onChannelEntered`
    pub const ON_CHANNEL_ENTERED: &str = "onChannelEntered";
    /// `onChannelExited`
    pub const ON_CHANNEL_EXITED: &str = "onChannelExited";
    /// `onUserTalkingStateChanged`
    pub const ON_USER_TALKING_STATE_CHANGED: &str = "onUserTalkingStateChanged";
    /// `onReceiveData`
    pub const ON_RECEIVE_DATA: &str = "onReceiveData";
    /// `onAudioInput`
    pub const ON_AUDIO_INPUT: &str = "onAudioInput";
    /// `onAudioSourceFetched`
    pub const ON_AUDIO_SOURCE_FETCHED: &str = "onAudioSourceFetched";
    /// `onAudioSourceProcessed`
    pub const ON_AUDIO_SOURCE_PROCESSED: &str = "onAudioSourceProcessed";
    /// `onAudioOutputAboutToPlay`
    pub const ON_AUDIO_OUTPUT_ABOUT_TO_PLAY: &str = "onAudioOutputAboutToPlay";
}

/// Symbols every current-ABI plugin must export.
pub const MANDATORY_SYMBOLS: [&str; 5] = [
    symbols::INIT,
    symbols::SHUTDOWN,
    symbols::GET_NAME,
    symbols::GET_API_VERSION,
    symbols::REGISTER_API_FUNCTIONS,
];

/// Symbols that are only honoured when all three are exported.
pub const POSITIONAL_SYMBOLS: [&str; 3] = [
    symbols::INIT_POSITIONAL_DATA,
    symbols::FETCH_POSITIONAL_DATA,
    symbols::SHUTDOWN_POSITIONAL_DATA,
];

/// `ErrorCode init(void)`
pub type InitFn = unsafe extern "C" fn() -> ErrorCode;
/// `void shutdown(void)`
pub type ShutdownFn = unsafe extern "C" fn();
/// `const char *getName(void)`
pub type GetNameFn = unsafe extern "C" fn() -> *const c_char;
/// `Version getAPIVersion(void)`
pub type GetApiVersionFn = unsafe extern "C" fn() -> Version;
/// `void registerAPIFunctions(const HostApi *api)`
///
/// The table lives for the whole process, so plugins may keep the pointer.
pub type RegisterApiFunctionsFn = unsafe extern "C" fn(api: *const HostApi);
/// `void setMumbleInfo(Version host, Version api, Version minimumApi)`
pub type SetHostInfoFn =
    unsafe extern "C" fn(host_version: Version, api_version: Version, minimum_api_version: Version);
/// `Version getVersion(void)`
pub type GetVersionFn = unsafe extern "C" fn() -> Version;
/// `const char *getAuthor(void)`
pub type GetAuthorFn = unsafe extern "C" fn() -> *const c_char;
/// `const char *getDescription(void)`
pub type GetDescriptionFn = unsafe extern "C" fn() -> *const c_char;
/// `void registerPluginID(PluginId id)`
pub type RegisterPluginIdFn = unsafe extern "C" fn(id: PluginId);
/// `uint32_t getPluginFeatures(void)`
pub type GetPluginFeaturesFn = unsafe extern "C" fn() -> u32;
/// `uint32_t deactivateFeatures(uint32_t features)`; returns the features
/// that could not be deactivated.
pub type DeactivateFeaturesFn = unsafe extern "C" fn(features: u32) -> u32;
/// `uint8_t initPositionalData(const char **names, const uint64_t *pids, size_t count)`
pub type InitPositionalDataFn =
    unsafe extern "C" fn(names: *const *const c_char, pids: *const u64, count: usize) -> u8;
/// `bool fetchPositionalData(float *avatarPos, float *avatarFront, float *avatarTop,
/// float *cameraPos, float *cameraFront, float *cameraTop, const char **context,
/// const char **identity)`
///
/// Each `float *` points at three consecutive floats. Returning `false`
/// tells the host to stop asking this plugin.
pub type FetchPositionalDataFn = unsafe extern "C" fn(
    avatar_position: *mut f32,
    avatar_front: *mut f32,
    avatar_top: *mut f32,
    camera_position: *mut f32,
    camera_front: *mut f32,
    camera_top: *mut f32,
    context: *mut *const c_char,
    identity: *mut *const c_char,
) -> bool;
/// `void shutdownPositionalData(void)`
pub type ShutdownPositionalDataFn = unsafe extern "C" fn();
/// `void onServerConnected(ConnectionId connection)`
pub type OnServerConnectedFn = unsafe extern "C" fn(connection: ConnectionId);
/// `void onServerDisconnected(ConnectionId connection)`
pub type OnServerDisconnectedFn = unsafe extern "C" fn(connection: ConnectionId);
/// `void onChannelEntered(ConnectionId, UserId, ChannelId previous, ChannelId new)`
pub type OnChannelEnteredFn = unsafe extern "C" fn(
    connection: ConnectionId,
    user: UserId,
    previous_channel: ChannelId,
    new_channel: ChannelId,
);
/// `void onChannelExited(ConnectionId, UserId, ChannelId)`
pub type OnChannelExitedFn =
    unsafe extern "C" fn(connection: ConnectionId, user: UserId, channel: ChannelId);
/// `void onUserTalkingStateChanged(ConnectionId, UserId, TalkingState)`
pub type OnUserTalkingStateChangedFn =
    unsafe extern "C" fn(connection: ConnectionId, user: UserId, state: TalkingState);
/// `bool onReceiveData(ConnectionId, UserId sender, const uint8_t *data, size_t length,
/// const char *dataId)`
pub type OnReceiveDataFn = unsafe extern "C" fn(
    connection: ConnectionId,
    sender: UserId,
    data: *const u8,
    length: usize,
    data_id: *const c_char,
) -> bool;
/// `bool onAudioInput(short *samples, uint32_t sampleCount, uint16_t channelCount, bool isSpeech)`
pub type OnAudioInputFn = unsafe extern "C" fn(
    samples: *mut i16,
    sample_count: u32,
    channel_count: u16,
    is_speech: bool,
) -> bool;
/// `bool onAudioSourceFetched(float *samples, uint32_t sampleCount, uint16_t channelCount,
/// bool isSpeech, UserId user)`
pub type OnAudioSourceFetchedFn = unsafe extern "C" fn(
    samples: *mut f32,
    sample_count: u32,
    channel_count: u16,
    is_speech: bool,
    user: UserId,
) -> bool;
/// Same shape as [`OnAudioSourceFetchedFn`], called after the host's own
/// processing of the source.
pub type OnAudioSourceProcessedFn = unsafe extern "C" fn(
    samples: *mut f32,
    sample_count: u32,
    channel_count: u16,
    is_speech: bool,
    user: UserId,
) -> bool;
/// `bool onAudioOutputAboutToPlay(float *samples, uint32_t sampleCount, uint16_t channelCount)`
pub type OnAudioOutputAboutToPlayFn =
    unsafe extern "C" fn(samples: *mut f32, sample_count: u32, channel_count: u16) -> bool;
