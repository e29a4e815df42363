//! Function table the host hands to plugins through `registerAPIFunctions`.
//!
//! Every function takes the caller's [`PluginId`] first and reports its
//! outcome as an [`ErrorCode`]; results are written through out-pointers.
//! Strings and arrays returned this way are allocated by the host and must be
//! handed back through `free_memory`.

use std::ffi::{c_char, c_void};

use crate::{ChannelId, ConnectionId, ErrorCode, PluginId, TransmissionMode, UserId};

/// `freeMemory`
pub type FreeMemoryFn = unsafe extern "C" fn(caller: PluginId, pointer: *const c_void) -> ErrorCode;
/// `getActiveServerConnection`
pub type GetActiveServerConnectionFn =
    unsafe extern "C" fn(caller: PluginId, connection: *mut ConnectionId) -> ErrorCode;
/// `getLocalUserID`
pub type GetLocalUserIdFn =
    unsafe extern "C" fn(caller: PluginId, connection: ConnectionId, user: *mut UserId) -> ErrorCode;
/// `getUserName`
pub type GetUserNameFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    name: *mut *const c_char,
) -> ErrorCode;
/// `getChannelName`
pub type GetChannelNameFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    channel: ChannelId,
    name: *mut *const c_char,
) -> ErrorCode;
/// `getAllUsers`
pub type GetAllUsersFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    users: *mut *const UserId,
    count: *mut usize,
) -> ErrorCode;
/// `getAllChannels`
pub type GetAllChannelsFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    channels: *mut *const ChannelId,
    count: *mut usize,
) -> ErrorCode;
/// `getChannelOfUser`
pub type GetChannelOfUserFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    channel: *mut ChannelId,
) -> ErrorCode;
/// `getUsersInChannel`
pub type GetUsersInChannelFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    channel: ChannelId,
    users: *mut *const UserId,
    count: *mut usize,
) -> ErrorCode;
/// `getLocalUserTransmissionMode`
pub type GetLocalUserTransmissionModeFn =
    unsafe extern "C" fn(caller: PluginId, mode: *mut TransmissionMode) -> ErrorCode;
/// `requestLocalUserTransmissionMode`
pub type RequestLocalUserTransmissionModeFn =
    unsafe extern "C" fn(caller: PluginId, mode: TransmissionMode) -> ErrorCode;
/// `requestUserMove`; `password` may be null.
pub type RequestUserMoveFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    channel: ChannelId,
    password: *const c_char,
) -> ErrorCode;
/// `requestMicrophoneActivationOverwrite`
pub type RequestMicrophoneActivationOverwriteFn =
    unsafe extern "C" fn(caller: PluginId, activate: bool) -> ErrorCode;
/// `findUserByName`
pub type FindUserByNameFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    name: *const c_char,
    user: *mut UserId,
) -> ErrorCode;
/// `findChannelByName`
pub type FindChannelByNameFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    name: *const c_char,
    channel: *mut ChannelId,
) -> ErrorCode;
/// `sendData`
pub type SendDataFn = unsafe extern "C" fn(
    caller: PluginId,
    connection: ConnectionId,
    users: *const UserId,
    user_count: usize,
    data: *const u8,
    data_len: usize,
    data_id: *const c_char,
) -> ErrorCode;
/// `log`
pub type LogFn = unsafe extern "C" fn(caller: PluginId, message: *const c_char) -> ErrorCode;
/// `playSample`
pub type PlaySampleFn = unsafe extern "C" fn(caller: PluginId, path: *const c_char) -> ErrorCode;

/// Host API table, version 1.0.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostApi {
    /// Releases memory the host handed out.
    pub free_memory: FreeMemoryFn,
    /// Current server connection.
    pub get_active_server_connection: GetActiveServerConnectionFn,
    /// Local user on a connection.
    pub get_local_user_id: GetLocalUserIdFn,
    /// Name of a user.
    pub get_user_name: GetUserNameFn,
    /// Name of a channel.
    pub get_channel_name: GetChannelNameFn,
    /// Every user on a connection.
    pub get_all_users: GetAllUsersFn,
    /// Every channel on a connection.
    pub get_all_channels: GetAllChannelsFn,
    /// Channel a user is in.
    pub get_channel_of_user: GetChannelOfUserFn,
    /// Users in a channel.
    pub get_users_in_channel: GetUsersInChannelFn,
    /// Local transmission mode.
    pub get_local_user_transmission_mode: GetLocalUserTransmissionModeFn,
    /// Changes the local transmission mode.
    pub request_local_user_transmission_mode: RequestLocalUserTransmissionModeFn,
    /// Moves a user to another channel.
    pub request_user_move: RequestUserMoveFn,
    /// Forces the microphone open regardless of transmission mode.
    pub request_microphone_activation_overwrite: RequestMicrophoneActivationOverwriteFn,
    /// Looks a user up by name.
    pub find_user_by_name: FindUserByNameFn,
    /// Looks a channel up by name.
    pub find_channel_by_name: FindChannelByNameFn,
    /// Sends plugin data to other users.
    pub send_data: SendDataFn,
    /// Writes to the host log.
    pub log: LogFn,
    /// Plays a sound file locally.
    pub play_sample: PlaySampleFn,
}
