//! Reference positional-audio plugin for the Lyre plugin host.
//!
//! The plugin speaks the current ABI. It attaches when a process named
//! [`DEMO_GAME_PROCESS`] is running and reports an avatar walking along the
//! X axis, half a metre per fetch. It greets the host through the `log`
//! callback once initialised.
//!
//! Building the crate produces a loadable library
//! (`liblyre_demo_plugin.so`, `lyre_demo_plugin.dll`, or
//! `liblyre_demo_plugin.dylib`). [`exported_symbols`] lists the same entry
//! points for hosts that register the plugin as a built-in.

#![expect(non_snake_case, reason = "exported names are fixed by the plugin ABI")]

use std::ffi::{CStr, c_char, c_void};
use std::sync::atomic::{AtomicPtr, AtomicU16, AtomicU32, Ordering};

use lyre_plugin_abi::current::symbols;
use lyre_plugin_abi::{ErrorCode, HostApi, PluginFeatures, PluginId, PositionalDataCode, Version};

/// Executable name the plugin looks for among the offered processes.
pub const DEMO_GAME_PROCESS: &str = "lyre-demo-game";

/// Metres the avatar moves per fetch.
const STRIDE: f32 = 0.5;

static HOST_API: AtomicPtr<HostApi> = AtomicPtr::new(std::ptr::null_mut());
static PLUGIN_ID: AtomicU32 = AtomicU32::new(0);
static STEPS: AtomicU16 = AtomicU16::new(0);

fn log_to_host(message: &CStr) {
    let api = HOST_API.load(Ordering::Acquire);
    if api.is_null() {
        return;
    }
    // SAFETY: the host table lives for the whole process once registered.
    let api = unsafe { &*api };
    // SAFETY: `message` is NUL-terminated and outlives the call.
    let _ = unsafe { (api.log)(PLUGIN_ID.load(Ordering::Relaxed), message.as_ptr()) };
}

// ---------------------------------------------------------------------------
// Mandatory entry points
// ---------------------------------------------------------------------------

/// Initialises the plugin.
#[unsafe(no_mangle)]
pub extern "C" fn init() -> ErrorCode {
    STEPS.store(0, Ordering::Relaxed);
    log_to_host(c"demo plugin ready");
    ErrorCode::OK
}

/// Releases everything `init` set up.
#[unsafe(no_mangle)]
pub extern "C" fn shutdown() {
    HOST_API.store(std::ptr::null_mut(), Ordering::Release);
}

/// Display name.
#[unsafe(no_mangle)]
pub extern "C" fn getName() -> *const c_char {
    c"Lyre demo".as_ptr()
}

/// Plugin API version this plugin was written against.
#[unsafe(no_mangle)]
pub extern "C" fn getAPIVersion() -> Version {
    Version::PLUGIN_API
}

/// Stores the host API table.
///
/// # Safety
///
/// `api` must be null or point at a table that outlives the plugin.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn registerAPIFunctions(api: *const HostApi) {
    HOST_API.store(api.cast_mut(), Ordering::Release);
}

// ---------------------------------------------------------------------------
// Optional entry points
// ---------------------------------------------------------------------------

/// Plugin version.
#[unsafe(no_mangle)]
pub extern "C" fn getVersion() -> Version {
    Version::new(0, 1, 0)
}

/// Author.
#[unsafe(no_mangle)]
pub extern "C" fn getAuthor() -> *const c_char {
    c"Lyre developers".as_ptr()
}

/// One-line description.
#[unsafe(no_mangle)]
pub extern "C" fn getDescription() -> *const c_char {
    c"Walks an avatar along the X axis while lyre-demo-game runs".as_ptr()
}

/// Remembers the ID used when calling back into the host.
#[unsafe(no_mangle)]
pub extern "C" fn registerPluginID(id: PluginId) {
    PLUGIN_ID.store(id, Ordering::Relaxed);
}

/// Only positional data is offered.
#[unsafe(no_mangle)]
pub extern "C" fn getPluginFeatures() -> u32 {
    PluginFeatures::POSITIONAL.bits()
}

/// Positional data cannot be switched off.
#[unsafe(no_mangle)]
pub extern "C" fn deactivateFeatures(features: u32) -> u32 {
    features & PluginFeatures::POSITIONAL.bits()
}

/// Accepts when [`DEMO_GAME_PROCESS`] is among the offered processes.
///
/// # Safety
///
/// `names` and `pids` must point at `count` valid entries.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn initPositionalData(
    names: *const *const c_char,
    _pids: *const u64,
    count: usize,
) -> u8 {
    if names.is_null() {
        return PositionalDataCode::ERROR_TEMP.0;
    }
    // SAFETY: the host passes `count` NUL-terminated names.
    let found = (0..count).any(|index| {
        let name = unsafe { CStr::from_ptr(*names.add(index)) };
        name.to_bytes() == DEMO_GAME_PROCESS.as_bytes()
    });
    if found {
        STEPS.store(0, Ordering::Relaxed);
        PositionalDataCode::OK.0
    } else {
        PositionalDataCode::ERROR_TEMP.0
    }
}

/// Reports the next pose. Never asks the host to stop.
///
/// # Safety
///
/// Every vector pointer must address three writable floats and both string
/// pointers must be writable.
#[expect(clippy::too_many_arguments, reason = "mirrors the C signature")]
#[expect(clippy::float_arithmetic, reason = "avatar position along the walk")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fetchPositionalData(
    avatar_position: *mut f32,
    avatar_front: *mut f32,
    avatar_top: *mut f32,
    camera_position: *mut f32,
    camera_front: *mut f32,
    camera_top: *mut f32,
    context: *mut *const c_char,
    identity: *mut *const c_char,
) -> bool {
    let step = STEPS.fetch_add(1, Ordering::Relaxed);
    let x = f32::from(step) * STRIDE;

    let write = |target: *mut f32, values: [f32; 3]| {
        for (offset, value) in values.into_iter().enumerate() {
            // SAFETY: the host passes three writable floats per vector.
            unsafe { target.add(offset).write(value) };
        }
    };
    write(avatar_position, [x, 0.0, 0.0]);
    write(avatar_front, [1.0, 0.0, 0.0]);
    write(avatar_top, [0.0, 1.0, 0.0]);
    write(camera_position, [x, 1.5, 0.0]);
    write(camera_front, [1.0, 0.0, 0.0]);
    write(camera_top, [0.0, 1.0, 0.0]);
    // SAFETY: string slots supplied by the host.
    unsafe {
        context.write(c"demo-server".as_ptr());
        identity.write(c"demo-walker".as_ptr());
    }
    true
}

/// Stops the walk.
#[unsafe(no_mangle)]
pub extern "C" fn shutdownPositionalData() {
    STEPS.store(0, Ordering::Relaxed);
}

/// Entry points by exported name, for registering the plugin as a built-in.
#[must_use]
pub fn exported_symbols() -> [(&'static str, *const c_void); 14] {
    [
        (symbols::INIT, init as *const c_void),
        (symbols::SHUTDOWN, shutdown as *const c_void),
        (symbols::GET_NAME, getName as *const c_void),
        (symbols::GET_API_VERSION, getAPIVersion as *const c_void),
        (
            symbols::REGISTER_API_FUNCTIONS,
            registerAPIFunctions as *const c_void,
        ),
        (symbols::GET_VERSION, getVersion as *const c_void),
        (symbols::GET_AUTHOR, getAuthor as *const c_void),
        (symbols::GET_DESCRIPTION, getDescription as *const c_void),
        (symbols::REGISTER_PLUGIN_ID, registerPluginID as *const c_void),
        (symbols::GET_PLUGIN_FEATURES, getPluginFeatures as *const c_void),
        (symbols::DEACTIVATE_FEATURES, deactivateFeatures as *const c_void),
        (
            symbols::INIT_POSITIONAL_DATA,
            initPositionalData as *const c_void,
        ),
        (
            symbols::FETCH_POSITIONAL_DATA,
            fetchPositionalData as *const c_void,
        ),
        (
            symbols::SHUTDOWN_POSITIONAL_DATA,
            shutdownPositionalData as *const c_void,
        ),
    ]
}
