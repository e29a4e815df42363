//! Fake plugins for unit and behaviour tests.
//!
//! Entry points are plain `extern "C"` functions registered in a
//! [`StaticSymbols`] table. Calls are recorded in a thread-local journal;
//! tests start from a clean journal through [`reset_journal`].

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, c_char, c_void};

use lyre_plugin_abi::current::symbols;
use lyre_plugin_abi::{
    ErrorCode, HostApi, PluginFeatures, PluginId, PositionalDataCode, UserId, Version,
};

use crate::plugin::{AbiGeneration, Plugin, PluginIdAllocator};
use crate::resolver::StaticSymbols;

thread_local! {
    static JOURNAL: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static REGISTERED_ID: Cell<Option<PluginId>> = const { Cell::new(None) };
    static OFFERED: RefCell<Vec<(String, u64)>> = const { RefCell::new(Vec::new()) };
}

fn record(entry: &'static str) {
    JOURNAL.with(|journal| journal.borrow_mut().push(entry));
}

/// Clears every thread-local record.
pub(crate) fn reset_journal() {
    JOURNAL.with(|journal| journal.borrow_mut().clear());
    REGISTERED_ID.with(|id| id.set(None));
    OFFERED.with(|offered| offered.borrow_mut().clear());
}

/// Entry points called since the last reset, in order.
pub(crate) fn journal() -> Vec<&'static str> {
    JOURNAL.with(|journal| journal.borrow().clone())
}

/// Number of times `entry` was called since the last reset.
pub(crate) fn calls(entry: &str) -> usize {
    JOURNAL.with(|journal| journal.borrow().iter().filter(|e| **e == entry).count())
}

/// ID passed to the last `registerPluginID`.
pub(crate) fn registered_id() -> Option<PluginId> {
    REGISTERED_ID.with(Cell::get)
}

/// Processes passed to the last current-ABI `initPositionalData`.
pub(crate) fn offered_processes() -> Vec<(String, u64)> {
    OFFERED.with(|offered| offered.borrow().clone())
}

// ---------------------------------------------------------------------------
// Mandatory entry points
// ---------------------------------------------------------------------------

extern "C" fn init() -> ErrorCode {
    record(symbols::INIT);
    ErrorCode::OK
}

extern "C" fn init_failing() -> ErrorCode {
    record(symbols::INIT);
    ErrorCode::GENERIC_ERROR
}

extern "C" fn shutdown() {
    record(symbols::SHUTDOWN);
}

extern "C" fn get_name() -> *const c_char {
    c"Fake plugin".as_ptr()
}

extern "C" fn get_api_version() -> Version {
    Version::PLUGIN_API
}

extern "C" fn get_future_api_version() -> Version {
    Version::new(2, 0, 0)
}

extern "C" fn register_api_functions(api: *const HostApi) {
    assert!(!api.is_null());
    record(symbols::REGISTER_API_FUNCTIONS);
}

// ---------------------------------------------------------------------------
// Optional entry points
// ---------------------------------------------------------------------------

extern "C" fn set_host_info(_host: Version, api: Version, minimum: Version) {
    assert_eq!(api, Version::PLUGIN_API);
    assert_eq!(minimum, Version::MINIMUM_PLUGIN_API);
    record(symbols::SET_MUMBLE_INFO);
}

extern "C" fn get_version() -> Version {
    record(symbols::GET_VERSION);
    Version::new(1, 2, 3)
}

extern "C" fn get_author() -> *const c_char {
    c"Lyre developers".as_ptr()
}

extern "C" fn get_description() -> *const c_char {
    c"Reports a fixed pose".as_ptr()
}

extern "C" fn register_plugin_id(id: PluginId) {
    REGISTERED_ID.with(|registered| registered.set(Some(id)));
    record(symbols::REGISTER_PLUGIN_ID);
}

extern "C" fn get_plugin_features() -> u32 {
    (PluginFeatures::POSITIONAL | PluginFeatures::AUDIO).bits()
}

extern "C" fn deactivate_features(requested: u32) -> u32 {
    // Audio can be switched off, positional data cannot.
    requested & PluginFeatures::POSITIONAL.bits()
}

unsafe extern "C" fn init_positional_ok(
    names: *const *const c_char,
    pids: *const u64,
    count: usize,
) -> u8 {
    record(symbols::INIT_POSITIONAL_DATA);
    let mut offered = Vec::with_capacity(count);
    for index in 0..count {
        // SAFETY: the host passes `count` valid names and pids.
        let (name, pid) = unsafe { (CStr::from_ptr(*names.add(index)), *pids.add(index)) };
        offered.push((name.to_string_lossy().into_owned(), pid));
    }
    OFFERED.with(|cell| *cell.borrow_mut() = offered);
    PositionalDataCode::OK.0
}

extern "C" fn init_positional_temp(_: *const *const c_char, _: *const u64, _: usize) -> u8 {
    record(symbols::INIT_POSITIONAL_DATA);
    PositionalDataCode::ERROR_TEMP.0
}

extern "C" fn init_positional_perm(_: *const *const c_char, _: *const u64, _: usize) -> u8 {
    record(symbols::INIT_POSITIONAL_DATA);
    PositionalDataCode::ERROR_PERM.0
}

/// Writes `[1, 2, 3]` as the avatar position, unit axes elsewhere.
unsafe fn write_pose(
    avatar_position: *mut f32,
    avatar_front: *mut f32,
    avatar_top: *mut f32,
    camera_position: *mut f32,
    camera_front: *mut f32,
    camera_top: *mut f32,
) {
    let write = |target: *mut f32, values: [f32; 3]| {
        for (offset, value) in values.into_iter().enumerate() {
            // SAFETY: the host passes three writable floats per vector.
            unsafe { target.add(offset).write(value) };
        }
    };
    write(avatar_position, [1.0, 2.0, 3.0]);
    write(avatar_front, [0.0, 0.0, 1.0]);
    write(avatar_top, [0.0, 1.0, 0.0]);
    write(camera_position, [1.0, 2.5, 3.0]);
    write(camera_front, [0.0, 0.0, 1.0]);
    write(camera_top, [0.0, 1.0, 0.0]);
}

#[expect(clippy::too_many_arguments, reason = "mirrors the C signature")]
unsafe extern "C" fn fetch_positional(
    avatar_position: *mut f32,
    avatar_front: *mut f32,
    avatar_top: *mut f32,
    camera_position: *mut f32,
    camera_front: *mut f32,
    camera_top: *mut f32,
    context: *mut *const c_char,
    identity: *mut *const c_char,
) -> bool {
    record(symbols::FETCH_POSITIONAL_DATA);
    // SAFETY: pointers supplied by the host.
    unsafe {
        write_pose(
            avatar_position,
            avatar_front,
            avatar_top,
            camera_position,
            camera_front,
            camera_top,
        );
        context.write(c"server/team-blue".as_ptr());
        identity.write(c"player-one".as_ptr());
    }
    true
}

#[expect(clippy::too_many_arguments, reason = "mirrors the C signature")]
unsafe extern "C" fn fetch_positional_stop(
    avatar_position: *mut f32,
    _: *mut f32,
    _: *mut f32,
    _: *mut f32,
    _: *mut f32,
    _: *mut f32,
    _: *mut *const c_char,
    _: *mut *const c_char,
) -> bool {
    record(symbols::FETCH_POSITIONAL_DATA);
    // SAFETY: three writable floats.
    unsafe { avatar_position.write(f32::NAN) };
    false
}

extern "C" fn shutdown_positional() {
    record(symbols::SHUTDOWN_POSITIONAL_DATA);
}

unsafe extern "C" fn on_audio_input(
    samples: *mut i16,
    sample_count: u32,
    channel_count: u16,
    _is_speech: bool,
) -> bool {
    record(symbols::ON_AUDIO_INPUT);
    if sample_count == 0 || channel_count == 0 {
        return false;
    }
    // SAFETY: at least one sample is present.
    unsafe { samples.write(0) };
    true
}

unsafe extern "C" fn on_receive_data(
    _connection: i32,
    _sender: UserId,
    _data: *const u8,
    _length: usize,
    data_id: *const c_char,
) -> bool {
    record(symbols::ON_RECEIVE_DATA);
    // SAFETY: the host passes a NUL-terminated id.
    (unsafe { CStr::from_ptr(data_id) }) == c"fake/ping"
}

extern "C" fn on_server_connected(_connection: i32) {
    record(symbols::ON_SERVER_CONNECTED);
}

/// Defines a `getName` returning a fixed string.
macro_rules! name_fn {
    ($fn_name:ident, $text:literal) => {
        pub(crate) extern "C" fn $fn_name() -> *const c_char {
            $text.as_ptr()
        }
    };
}

name_fn!(name_apple, c"apple");
name_fn!(name_banana, c"Banana");
name_fn!(name_cherry, c"Cherry");

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// How the fake answers `initPositionalData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PositionalAnswer {
    Ok,
    Temporary,
    Permanent,
}

impl PositionalAnswer {
    fn entry(self) -> *const c_void {
        match self {
            Self::Ok => init_positional_ok as *const c_void,
            Self::Temporary => init_positional_temp as *const c_void,
            Self::Permanent => init_positional_perm as *const c_void,
        }
    }
}

/// Builds symbol tables for fake current-ABI plugins.
#[derive(Debug, Clone)]
pub(crate) struct FakePlugin {
    symbols: StaticSymbols,
}

impl FakePlugin {
    /// A plugin exporting the five mandatory entry points.
    pub(crate) fn minimal(label: &str) -> Self {
        Self {
            symbols: StaticSymbols::new(label)
                .with(symbols::INIT, init as *const c_void)
                .with(symbols::SHUTDOWN, shutdown as *const c_void)
                .with(symbols::GET_NAME, get_name as *const c_void)
                .with(symbols::GET_API_VERSION, get_api_version as *const c_void)
                .with(
                    symbols::REGISTER_API_FUNCTIONS,
                    register_api_functions as *const c_void,
                ),
        }
    }

    /// A plugin exporting every metadata entry point and two event callbacks.
    pub(crate) fn full(label: &str) -> Self {
        Self::minimal(label)
            .with(symbols::SET_MUMBLE_INFO, set_host_info as *const c_void)
            .with(symbols::GET_VERSION, get_version as *const c_void)
            .with(symbols::GET_AUTHOR, get_author as *const c_void)
            .with(symbols::GET_DESCRIPTION, get_description as *const c_void)
            .with(symbols::REGISTER_PLUGIN_ID, register_plugin_id as *const c_void)
            .with(symbols::GET_PLUGIN_FEATURES, get_plugin_features as *const c_void)
            .with(symbols::DEACTIVATE_FEATURES, deactivate_features as *const c_void)
            .with(symbols::ON_AUDIO_INPUT, on_audio_input as *const c_void)
            .with(symbols::ON_RECEIVE_DATA, on_receive_data as *const c_void)
            .with(symbols::ON_SERVER_CONNECTED, on_server_connected as *const c_void)
    }

    /// Adds the three positional entry points; `fetch` keeps providing data.
    pub(crate) fn positional(self, answer: PositionalAnswer) -> Self {
        self.with(symbols::INIT_POSITIONAL_DATA, answer.entry())
            .with(symbols::FETCH_POSITIONAL_DATA, fetch_positional as *const c_void)
            .with(
                symbols::SHUTDOWN_POSITIONAL_DATA,
                shutdown_positional as *const c_void,
            )
    }

    /// Makes `fetchPositionalData` signal stop.
    pub(crate) fn stopping_fetch(self) -> Self {
        self.with(
            symbols::FETCH_POSITIONAL_DATA,
            fetch_positional_stop as *const c_void,
        )
    }

    /// Makes `init` fail.
    pub(crate) fn failing_init(self) -> Self {
        self.with(symbols::INIT, init_failing as *const c_void)
    }

    /// Declares API version 2.0.0.
    pub(crate) fn future_api(self) -> Self {
        self.with(symbols::GET_API_VERSION, get_future_api_version as *const c_void)
    }

    /// Replaces `getName`.
    pub(crate) fn named(self, get_name: extern "C" fn() -> *const c_char) -> Self {
        self.with(symbols::GET_NAME, get_name as *const c_void)
    }

    pub(crate) fn with(self, symbol: &str, address: *const c_void) -> Self {
        Self {
            symbols: self.symbols.with(symbol, address),
        }
    }

    pub(crate) fn without(self, symbol: &str) -> Self {
        Self {
            symbols: self.symbols.without(symbol),
        }
    }

    pub(crate) fn symbols(self) -> StaticSymbols {
        self.symbols
    }

    /// Validates the fake as a built-in current-ABI plugin.
    pub(crate) fn build(self, ids: &PluginIdAllocator) -> Plugin {
        Plugin::built_in(Box::new(self.symbols), AbiGeneration::Current, ids)
            .expect("fake plugin is valid")
    }
}
