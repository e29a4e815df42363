//! Struct-based legacy plugin ABI.
//!
//! A legacy plugin exports up to three factory functions, each returning a
//! pointer to a static struct owned by the plugin:
//!
//! | Symbol | Struct | Presence |
//! |--------|--------|----------|
//! | `getMumblePlugin` | [`LegacyPlugin`] | mandatory |
//! | `getMumblePlugin2` | [`LegacyPlugin2`] | optional, adds process-aware locking |
//! | `getMumblePluginQt` | [`LegacyPluginQt`] | optional, adds dialog hooks |
//!
//! Text is NUL-terminated wide characters ([`WideChar`], the platform's
//! `wchar_t`), except the positional context, which is an opaque byte buffer
//! described by pointer and length.

use std::ffi::c_void;

/// Platform `wchar_t`: UTF-16 code unit on Windows.
#[cfg(windows)]
pub type WideChar = u16;

/// Platform `wchar_t`: UTF-32 code point elsewhere.
#[cfg(not(windows))]
pub type WideChar = u32;

/// Magic number a valid primary struct carries.
pub const LEGACY_PLUGIN_MAGIC: u32 = 0xd63a_b7c0;

/// Magic number carried by the extended struct.
pub const LEGACY_PLUGIN_MAGIC_2: u32 = 0xd63a_b7fe;

/// Magic number carried by the dialog struct.
pub const LEGACY_PLUGIN_MAGIC_QT: u32 = 0xd63a_b7ff;

/// Short name authors use to withdraw a plugin without deleting the file.
pub const RETRACTED_SHORT_NAME: &str = "Retracted";

/// Exported factory symbol names.
pub mod symbols {
    /// Primary factory, mandatory.
    pub const GET_PLUGIN: &str = "getMumblePlugin";
    /// Extended factory.
    pub const GET_PLUGIN_2: &str = "getMumblePlugin2";
    /// Dialog factory.
    pub const GET_PLUGIN_QT: &str = "getMumblePluginQt";
}

/// `LegacyPlugin *getMumblePlugin(void)`
pub type GetPluginFn = unsafe extern "C" fn() -> *const LegacyPlugin;
/// `LegacyPlugin2 *getMumblePlugin2(void)`
pub type GetPlugin2Fn = unsafe extern "C" fn() -> *const LegacyPlugin2;
/// `LegacyPluginQt *getMumblePluginQt(void)`
pub type GetPluginQtFn = unsafe extern "C" fn() -> *const LegacyPluginQt;

/// Dialog callback receiving the parent window handle (always null here).
pub type DialogFn = unsafe extern "C" fn(parent: *mut c_void);
/// Primary try-lock: non-zero when the plugin attached to its game.
pub type TryLockFn = unsafe extern "C" fn() -> i32;
/// Releases whatever the try-lock acquired.
pub type UnlockFn = unsafe extern "C" fn();
/// Returns the long description as a wide string.
pub type LongDescriptionFn = unsafe extern "C" fn() -> *const WideChar;
/// Extended try-lock receiving the running processes.
pub type TryLockWithProcessesFn =
    unsafe extern "C" fn(processes: *const LegacyProcessEntry, count: usize) -> i32;

/// Legacy fetch.
///
/// Each `float *` points at three consecutive floats. The plugin points
/// `*context` at a buffer of `*context_len` bytes and `*identity` at a
/// NUL-terminated wide string, both owned by the plugin and valid until its
/// next call. Returns non-zero while the plugin is still attached.
pub type FetchFn = unsafe extern "C" fn(
    avatar_position: *mut f32,
    avatar_front: *mut f32,
    avatar_top: *mut f32,
    camera_position: *mut f32,
    camera_front: *mut f32,
    camera_top: *mut f32,
    context: *mut *const u8,
    context_len: *mut usize,
    identity: *mut *const WideChar,
) -> i32;

/// Primary legacy struct.
#[repr(C)]
#[derive(Debug)]
pub struct LegacyPlugin {
    /// Must equal [`LEGACY_PLUGIN_MAGIC`].
    pub magic: u32,
    /// Human-readable description.
    pub description: *const WideChar,
    /// Short display name.
    pub short_name: *const WideChar,
    /// About dialog hook.
    pub about: Option<DialogFn>,
    /// Configuration dialog hook.
    pub config: Option<DialogFn>,
    /// Attach to the game.
    pub try_lock: Option<TryLockFn>,
    /// Detach from the game.
    pub unlock: Option<UnlockFn>,
    /// Long description.
    pub long_description: Option<LongDescriptionFn>,
    /// Positional fetch.
    pub fetch: Option<FetchFn>,
}

/// Extended legacy struct adding process-aware locking.
#[repr(C)]
#[derive(Debug)]
pub struct LegacyPlugin2 {
    /// Should equal [`LEGACY_PLUGIN_MAGIC_2`].
    pub magic: u32,
    /// Struct revision.
    pub version: u32,
    /// Attach to the game given the running processes.
    pub try_lock: Option<TryLockWithProcessesFn>,
}

/// Dialog legacy struct.
#[repr(C)]
#[derive(Debug)]
pub struct LegacyPluginQt {
    /// Should equal [`LEGACY_PLUGIN_MAGIC_QT`].
    pub magic: u32,
    /// About dialog hook.
    pub about: Option<DialogFn>,
    /// Configuration dialog hook.
    pub config: Option<DialogFn>,
}

/// One running process handed to the extended try-lock.
///
/// Entries are sorted by name; processes sharing a name keep their
/// enumeration order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LegacyProcessEntry {
    /// NUL-terminated wide process name.
    pub name: *const WideChar,
    /// Process identifier.
    pub pid: u64,
}
