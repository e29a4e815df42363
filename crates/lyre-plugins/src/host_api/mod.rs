//! Host functions exposed to plugins.
//!
//! Plugins receive a [`HostApi`] table through `registerAPIFunctions`. The
//! functions in it answer from whichever [`HostBridge`] the embedding
//! application installed with [`install_host_bridge`]; without one they
//! report the matching "not available" status. Strings and arrays returned
//! to plugins are tracked by the allocation curator until the plugin hands
//! them back through `freeMemory`.

use std::borrow::Cow;
use std::ffi::{CStr, c_char, c_void};
use std::sync::{Arc, PoisonError, RwLock};

use lyre_plugin_abi::{
    ChannelId, ConnectionId, ErrorCode, HostApi, PluginId, TransmissionMode, UserId, Version,
};
use tracing::{debug, info};

use crate::error::PluginError;

mod curator;

pub use self::curator::outstanding_allocations;

/// Tracing target for host API calls.
const HOST_API_TARGET: &str = "lyre_plugins::host_api";

/// Tracing target for messages plugins write through `log`. Hosts filter
/// plugin output on this target independently of their own logs.
pub const PLUGIN_LOG_TARGET: &str = "lyre_plugins::plugin_log";

/// The embedding application's view of users, channels, and audio.
///
/// Every query returns the status code the plugin should see on failure.
#[cfg_attr(test, mockall::automock)]
pub trait HostBridge: Send + Sync {
    /// Connection currently in use.
    fn active_server_connection(&self) -> Result<ConnectionId, ErrorCode>;
    /// Local user's session ID on `connection`.
    fn local_user_id(&self, connection: ConnectionId) -> Result<UserId, ErrorCode>;
    /// Name of `user`.
    fn user_name(&self, connection: ConnectionId, user: UserId) -> Result<String, ErrorCode>;
    /// Name of `channel`.
    fn channel_name(
        &self,
        connection: ConnectionId,
        channel: ChannelId,
    ) -> Result<String, ErrorCode>;
    /// Every user on `connection`.
    fn all_users(&self, connection: ConnectionId) -> Result<Vec<UserId>, ErrorCode>;
    /// Every channel on `connection`.
    fn all_channels(&self, connection: ConnectionId) -> Result<Vec<ChannelId>, ErrorCode>;
    /// Channel `user` is in.
    fn channel_of_user(
        &self,
        connection: ConnectionId,
        user: UserId,
    ) -> Result<ChannelId, ErrorCode>;
    /// Users in `channel`.
    fn users_in_channel(
        &self,
        connection: ConnectionId,
        channel: ChannelId,
    ) -> Result<Vec<UserId>, ErrorCode>;
    /// Local transmission mode.
    fn local_user_transmission_mode(&self) -> Result<TransmissionMode, ErrorCode>;
    /// Switches the local transmission mode. `mode` is always a known mode.
    fn request_local_user_transmission_mode(&self, mode: TransmissionMode) -> ErrorCode;
    /// Moves `user` into `channel`. An empty `password` means none.
    fn request_user_move(
        &self,
        connection: ConnectionId,
        user: UserId,
        channel: ChannelId,
        password: &str,
    ) -> ErrorCode;
    /// Forces the microphone open, or returns it to normal.
    fn request_microphone_activation_overwrite(&self, activate: bool) -> ErrorCode;
    /// Looks a user up by name.
    fn find_user_by_name(&self, connection: ConnectionId, name: &str) -> Result<UserId, ErrorCode>;
    /// Looks a channel up by name.
    fn find_channel_by_name(
        &self,
        connection: ConnectionId,
        name: &str,
    ) -> Result<ChannelId, ErrorCode>;
    /// Sends plugin data to `users`.
    fn send_data(
        &self,
        caller: PluginId,
        connection: ConnectionId,
        users: &[UserId],
        data: &[u8],
        data_id: &str,
    ) -> ErrorCode;
    /// Shows a plugin message to the user.
    fn log(&self, caller: PluginId, message: &str) -> ErrorCode;
    /// Plays the sound file at `path`.
    fn play_sample(&self, caller: PluginId, path: &str) -> ErrorCode;
}

static HOST_BRIDGE: RwLock<Option<Arc<dyn HostBridge>>> = RwLock::new(None);

/// Routes host API calls to `bridge`, replacing any previous bridge.
pub fn install_host_bridge(bridge: Arc<dyn HostBridge>) {
    *HOST_BRIDGE.write().unwrap_or_else(PoisonError::into_inner) = Some(bridge);
    debug!(target: HOST_API_TARGET, "host bridge installed");
}

/// Removes the installed bridge; host API calls report "not available".
pub fn clear_host_bridge() {
    HOST_BRIDGE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}

fn current_bridge() -> Option<Arc<dyn HostBridge>> {
    HOST_BRIDGE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Returns the host API table for a plugin targeting `version`.
///
/// Only the major and minor components select a table; patch releases never
/// change its shape.
///
/// # Errors
///
/// Returns [`PluginError::UnsupportedApiVersion`] when no table exists for
/// the requested major and minor version.
pub fn host_api_for(version: Version) -> Result<&'static HostApi, PluginError> {
    match (version.major, version.minor) {
        (1, 0) => Ok(&API_V1_0),
        _ => Err(PluginError::UnsupportedApiVersion { version }),
    }
}

static API_V1_0: HostApi = HostApi {
    free_memory,
    get_active_server_connection,
    get_local_user_id,
    get_user_name,
    get_channel_name,
    get_all_users,
    get_all_channels,
    get_channel_of_user,
    get_users_in_channel,
    get_local_user_transmission_mode,
    request_local_user_transmission_mode,
    request_user_move,
    request_microphone_activation_overwrite,
    find_user_by_name,
    find_channel_by_name,
    send_data,
    log,
    play_sample,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ask<T>(
    unavailable: ErrorCode,
    query: impl FnOnce(&dyn HostBridge) -> Result<T, ErrorCode>,
) -> Result<T, ErrorCode> {
    current_bridge().map_or(Err(unavailable), |bridge| query(bridge.as_ref()))
}

fn request(unavailable: ErrorCode, call: impl FnOnce(&dyn HostBridge) -> ErrorCode) -> ErrorCode {
    current_bridge().map_or(unavailable, |bridge| call(bridge.as_ref()))
}

/// Writes the produced value through `target`.
///
/// # Safety
///
/// `target` must be null or valid for writes.
unsafe fn out<T>(target: *mut T, produce: impl FnOnce() -> Result<T, ErrorCode>) -> ErrorCode {
    if target.is_null() {
        return ErrorCode::GENERIC_ERROR;
    }
    match produce() {
        Ok(value) => {
            // SAFETY: non-null and writable per the caller.
            unsafe { target.write(value) };
            ErrorCode::OK
        }
        Err(code) => code,
    }
}

/// Writes a produced array and its length.
///
/// # Safety
///
/// Both pointers must be null or valid for writes.
unsafe fn out_array<T>(
    target: *mut *const T,
    count: *mut usize,
    produce: impl FnOnce() -> Result<(*const T, usize), ErrorCode>,
) -> ErrorCode {
    if target.is_null() || count.is_null() {
        return ErrorCode::GENERIC_ERROR;
    }
    match produce() {
        Ok((pointer, len)) => {
            // SAFETY: both non-null and writable per the caller.
            unsafe {
                target.write(pointer);
                count.write(len);
            }
            ErrorCode::OK
        }
        Err(code) => code,
    }
}

/// Borrows a plugin-supplied C string.
///
/// # Safety
///
/// `pointer` must be null or point at a NUL-terminated string that outlives
/// the returned value.
unsafe fn text<'a>(pointer: *const c_char) -> Option<Cow<'a, str>> {
    if pointer.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    Some(unsafe { CStr::from_ptr(pointer) }.to_string_lossy())
}

/// Borrows a plugin-supplied array; null is only accepted when `len` is 0.
///
/// # Safety
///
/// A non-null `pointer` must address `len` initialised elements.
unsafe fn slice<'a, T>(pointer: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if pointer.is_null() {
        return None;
    }
    // SAFETY: non-null and `len` elements per the caller.
    Some(unsafe { std::slice::from_raw_parts(pointer, len) })
}

// ---------------------------------------------------------------------------
// Version 1.0 functions
// ---------------------------------------------------------------------------

unsafe extern "C" fn free_memory(caller: PluginId, pointer: *const c_void) -> ErrorCode {
    let code = curator::release(pointer);
    if !code.is_ok() {
        debug!(target: HOST_API_TARGET, plugin_id = caller, "plugin freed unknown pointer");
    }
    code
}

unsafe extern "C" fn get_active_server_connection(
    _caller: PluginId,
    connection: *mut ConnectionId,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(connection, || {
            ask(ErrorCode::NO_ACTIVE_CONNECTION, |bridge| {
                bridge.active_server_connection()
            })
        })
    }
}

unsafe extern "C" fn get_local_user_id(
    _caller: PluginId,
    connection: ConnectionId,
    user: *mut UserId,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(user, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.local_user_id(connection)
            })
        })
    }
}

unsafe extern "C" fn get_user_name(
    _caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    name: *mut *const c_char,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(name, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.user_name(connection, user)
            })
            .and_then(curator::hand_out_text)
        })
    }
}

unsafe extern "C" fn get_channel_name(
    _caller: PluginId,
    connection: ConnectionId,
    channel: ChannelId,
    name: *mut *const c_char,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(name, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.channel_name(connection, channel)
            })
            .and_then(curator::hand_out_text)
        })
    }
}

unsafe extern "C" fn get_all_users(
    _caller: PluginId,
    connection: ConnectionId,
    users: *mut *const UserId,
    count: *mut usize,
) -> ErrorCode {
    // SAFETY: the plugin passes writable out-pointers.
    unsafe {
        out_array(users, count, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.all_users(connection)
            })
            .map(curator::hand_out_users)
        })
    }
}

unsafe extern "C" fn get_all_channels(
    _caller: PluginId,
    connection: ConnectionId,
    channels: *mut *const ChannelId,
    count: *mut usize,
) -> ErrorCode {
    // SAFETY: the plugin passes writable out-pointers.
    unsafe {
        out_array(channels, count, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.all_channels(connection)
            })
            .map(curator::hand_out_channels)
        })
    }
}

unsafe extern "C" fn get_channel_of_user(
    _caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    channel: *mut ChannelId,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(channel, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.channel_of_user(connection, user)
            })
        })
    }
}

unsafe extern "C" fn get_users_in_channel(
    _caller: PluginId,
    connection: ConnectionId,
    channel: ChannelId,
    users: *mut *const UserId,
    count: *mut usize,
) -> ErrorCode {
    // SAFETY: the plugin passes writable out-pointers.
    unsafe {
        out_array(users, count, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.users_in_channel(connection, channel)
            })
            .map(curator::hand_out_users)
        })
    }
}

unsafe extern "C" fn get_local_user_transmission_mode(
    _caller: PluginId,
    mode: *mut TransmissionMode,
) -> ErrorCode {
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(mode, || {
            ask(ErrorCode::GENERIC_ERROR, |bridge| {
                bridge.local_user_transmission_mode()
            })
        })
    }
}

unsafe extern "C" fn request_local_user_transmission_mode(
    _caller: PluginId,
    mode: TransmissionMode,
) -> ErrorCode {
    if !mode.is_known() {
        return ErrorCode::UNKNOWN_TRANSMISSION_MODE;
    }
    request(ErrorCode::GENERIC_ERROR, |bridge| {
        bridge.request_local_user_transmission_mode(mode)
    })
}

unsafe extern "C" fn request_user_move(
    _caller: PluginId,
    connection: ConnectionId,
    user: UserId,
    channel: ChannelId,
    password: *const c_char,
) -> ErrorCode {
    // SAFETY: the password is null or NUL-terminated.
    let password = unsafe { text(password) }.unwrap_or_default();
    request(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
        bridge.request_user_move(connection, user, channel, &password)
    })
}

unsafe extern "C" fn request_microphone_activation_overwrite(
    _caller: PluginId,
    activate: bool,
) -> ErrorCode {
    request(ErrorCode::GENERIC_ERROR, |bridge| {
        bridge.request_microphone_activation_overwrite(activate)
    })
}

unsafe extern "C" fn find_user_by_name(
    _caller: PluginId,
    connection: ConnectionId,
    name: *const c_char,
    user: *mut UserId,
) -> ErrorCode {
    // SAFETY: the name is null or NUL-terminated.
    let Some(name) = (unsafe { text(name) }) else {
        return ErrorCode::GENERIC_ERROR;
    };
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(user, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.find_user_by_name(connection, &name)
            })
        })
    }
}

unsafe extern "C" fn find_channel_by_name(
    _caller: PluginId,
    connection: ConnectionId,
    name: *const c_char,
    channel: *mut ChannelId,
) -> ErrorCode {
    // SAFETY: the name is null or NUL-terminated.
    let Some(name) = (unsafe { text(name) }) else {
        return ErrorCode::GENERIC_ERROR;
    };
    // SAFETY: the plugin passes a writable out-pointer.
    unsafe {
        out(channel, || {
            ask(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
                bridge.find_channel_by_name(connection, &name)
            })
        })
    }
}

unsafe extern "C" fn send_data(
    caller: PluginId,
    connection: ConnectionId,
    users: *const UserId,
    user_count: usize,
    data: *const u8,
    data_len: usize,
    data_id: *const c_char,
) -> ErrorCode {
    // SAFETY: the plugin passes arrays of the stated lengths and a
    // NUL-terminated data ID.
    let (users, data, data_id) = unsafe {
        (
            slice(users, user_count),
            slice(data, data_len),
            text(data_id),
        )
    };
    let (Some(users), Some(data), Some(data_id)) = (users, data, data_id) else {
        return ErrorCode::GENERIC_ERROR;
    };
    request(ErrorCode::CONNECTION_NOT_FOUND, |bridge| {
        bridge.send_data(caller, connection, users, data, &data_id)
    })
}

unsafe extern "C" fn log(caller: PluginId, message: *const c_char) -> ErrorCode {
    // SAFETY: the message is null or NUL-terminated.
    let Some(message) = (unsafe { text(message) }) else {
        return ErrorCode::GENERIC_ERROR;
    };
    info!(target: PLUGIN_LOG_TARGET, plugin_id = caller, "{message}");
    request(ErrorCode::OK, |bridge| bridge.log(caller, &message))
}

unsafe extern "C" fn play_sample(caller: PluginId, path: *const c_char) -> ErrorCode {
    // SAFETY: the path is null or NUL-terminated.
    let Some(path) = (unsafe { text(path) }) else {
        return ErrorCode::INVALID_SAMPLE;
    };
    request(ErrorCode::AUDIO_NOT_AVAILABLE, |bridge| {
        bridge.play_sample(caller, &path)
    })
}
