//! Unit tests for the legacy adapter.

use std::cell::{Cell, RefCell};
use std::ffi::c_void;

use lyre_plugin_abi::legacy::{
    LEGACY_PLUGIN_MAGIC, LEGACY_PLUGIN_MAGIC_2, LEGACY_PLUGIN_MAGIC_QT, LegacyPlugin,
    LegacyPlugin2, LegacyPluginQt, LegacyProcessEntry, WideChar, symbols,
};
use lyre_plugin_abi::{PluginFeatures, PositionalDataCode, Version};
use rstest::rstest;

use super::*;
use crate::plugin::{AbiGeneration, Plugin, PluginIdAllocator};
use crate::positional::{PositionalData, Vector3};
use crate::process::ProcessInfo;
use crate::resolver::StaticSymbols;

// ---------------------------------------------------------------------------
// Fixtures: static legacy structs
// ---------------------------------------------------------------------------

/// Lets a struct holding raw pointers live in a `static`.
struct Shared<T>(T);

// SAFETY: the wrapped structs are immutable and only point at other statics.
unsafe impl<T> Sync for Shared<T> {}

const fn wide<const N: usize>(ascii: &[u8; N]) -> [WideChar; N] {
    let mut units = [0; N];
    let mut index = 0;
    while index < N {
        units[index] = ascii[index] as WideChar;
        index += 1;
    }
    units
}

static DEMO_NAME: [WideChar; 5] = wide(b"Demo\0");
static RETRACTED_NAME: [WideChar; 10] = wide(b"Retracted\0");
static SHORT_DESCRIPTION: [WideChar; 6] = wide(b"Short\0");
static LONG_DESCRIPTION: [WideChar; 17] = wide(b"Long description\0");
static IDENTITY: [WideChar; 5] = wide(b"hero\0");

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static SECOND_CONTEXT: Cell<bool> = const { Cell::new(false) };
}

fn event(name: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(name.into()));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

extern "C" fn long_description() -> *const WideChar {
    LONG_DESCRIPTION.as_ptr()
}

extern "C" fn lock_attached() -> i32 {
    event("trylock");
    1
}

extern "C" fn lock_refused() -> i32 {
    event("trylock");
    0
}

extern "C" fn unlock() {
    event("unlock");
}

extern "C" fn primary_about(parent: *mut c_void) {
    assert!(parent.is_null());
    event("primary about");
}

extern "C" fn qt_about(_: *mut c_void) {
    event("qt about");
}

extern "C" fn qt_config(_: *mut c_void) {
    event("qt config");
}

unsafe extern "C" fn lock_with_processes(processes: *const LegacyProcessEntry, count: usize) -> i32 {
    // SAFETY: the host passes `count` entries.
    let entries = unsafe { std::slice::from_raw_parts(processes, count) };
    for entry in entries {
        // SAFETY: names are NUL-terminated wide strings.
        let name = unsafe { wide::to_string(entry.name) };
        event(format!("{name}:{}", entry.pid));
    }
    1
}

#[expect(clippy::too_many_arguments, reason = "mirrors the C signature")]
unsafe extern "C" fn fetch(
    avatar_position: *mut f32,
    _avatar_front: *mut f32,
    _avatar_top: *mut f32,
    _camera_position: *mut f32,
    _camera_front: *mut f32,
    _camera_top: *mut f32,
    context: *mut *const u8,
    context_len: *mut usize,
    identity: *mut *const WideChar,
) -> i32 {
    let bytes: &'static [u8] = if SECOND_CONTEXT.with(Cell::get) {
        b"match-2"
    } else {
        b"match-1"
    };
    // SAFETY: pointers supplied by the host.
    unsafe {
        avatar_position.write(4.0);
        avatar_position.add(1).write(5.0);
        avatar_position.add(2).write(6.0);
        context.write(bytes.as_ptr());
        context_len.write(bytes.len());
        identity.write(IDENTITY.as_ptr());
    }
    1
}

const fn primary(
    magic: u32,
    short_name: *const WideChar,
    description: *const WideChar,
) -> LegacyPlugin {
    LegacyPlugin {
        magic,
        description,
        short_name,
        about: Some(primary_about),
        config: None,
        try_lock: Some(lock_attached),
        unlock: Some(unlock),
        long_description: Some(long_description),
        fetch: Some(fetch),
    }
}

static GOOD: Shared<LegacyPlugin> = Shared(primary(
    LEGACY_PLUGIN_MAGIC,
    DEMO_NAME.as_ptr(),
    SHORT_DESCRIPTION.as_ptr(),
));
static WRONG_MAGIC: Shared<LegacyPlugin> = Shared(primary(
    0xdead_beef,
    DEMO_NAME.as_ptr(),
    SHORT_DESCRIPTION.as_ptr(),
));
static RETRACTED: Shared<LegacyPlugin> = Shared(primary(
    LEGACY_PLUGIN_MAGIC,
    RETRACTED_NAME.as_ptr(),
    SHORT_DESCRIPTION.as_ptr(),
));
static BARE: Shared<LegacyPlugin> = Shared(LegacyPlugin {
    magic: LEGACY_PLUGIN_MAGIC,
    description: std::ptr::null(),
    short_name: std::ptr::null(),
    about: None,
    config: None,
    try_lock: Some(lock_refused),
    unlock: None,
    long_description: None,
    fetch: None,
});
static EXTENDED: Shared<LegacyPlugin2> = Shared(LegacyPlugin2 {
    magic: LEGACY_PLUGIN_MAGIC_2,
    version: 2,
    try_lock: Some(lock_with_processes),
});
static DIALOGS: Shared<LegacyPluginQt> = Shared(LegacyPluginQt {
    magic: LEGACY_PLUGIN_MAGIC_QT,
    about: Some(qt_about),
    config: Some(qt_config),
});

extern "C" fn get_good() -> *const LegacyPlugin {
    &raw const GOOD.0
}

extern "C" fn get_wrong_magic() -> *const LegacyPlugin {
    &raw const WRONG_MAGIC.0
}

extern "C" fn get_retracted() -> *const LegacyPlugin {
    &raw const RETRACTED.0
}

extern "C" fn get_bare() -> *const LegacyPlugin {
    &raw const BARE.0
}

extern "C" fn get_null() -> *const LegacyPlugin {
    std::ptr::null()
}

extern "C" fn get_extended() -> *const LegacyPlugin2 {
    &raw const EXTENDED.0
}

extern "C" fn get_dialogs() -> *const LegacyPluginQt {
    &raw const DIALOGS.0
}

fn table(factory: extern "C" fn() -> *const LegacyPlugin) -> StaticSymbols {
    take_events();
    SECOND_CONTEXT.with(|flag| flag.set(false));
    StaticSymbols::new("legacy").with(symbols::GET_PLUGIN, factory as *const c_void)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn valid_struct_yields_name_and_long_description() {
    let adapter = LegacyAdapter::resolve(&table(get_good)).expect("valid legacy plugin");
    assert_eq!(adapter.name(), "Demo");
    assert_eq!(adapter.description(), "Long description");
    assert_eq!(adapter.version(), Version::new(1, 0, 0));
}

#[test]
fn missing_strings_fall_back_to_defaults() {
    let adapter = LegacyAdapter::resolve(&table(get_bare)).expect("valid legacy plugin");
    assert_eq!(adapter.name(), "Unknown plugin");
    assert_eq!(adapter.description(), "No description provided");
}

#[test]
fn wrong_magic_is_rejected() {
    let error = LegacyAdapter::resolve(&table(get_wrong_magic)).expect_err("magic mismatch");
    assert!(
        matches!(error, PluginError::LegacyMagicMismatch { found: 0xdead_beef, .. }),
        "unexpected error: {error}"
    );
}

#[test]
fn retracted_plugin_is_rejected() {
    let error = LegacyAdapter::resolve(&table(get_retracted)).expect_err("retracted");
    assert!(matches!(error, PluginError::Retracted { .. }), "{error}");
}

#[test]
fn null_struct_is_rejected() {
    let error = LegacyAdapter::resolve(&table(get_null)).expect_err("null struct");
    assert!(matches!(error, PluginError::Invalid { .. }), "{error}");
}

#[test]
fn missing_factory_is_rejected() {
    let error = LegacyAdapter::resolve(&StaticSymbols::new("empty")).expect_err("no factory");
    assert!(
        matches!(error, PluginError::MissingSymbol { symbol, .. } if symbol == symbols::GET_PLUGIN),
        "{error}"
    );
}

// ---------------------------------------------------------------------------
// Positional data
// ---------------------------------------------------------------------------

#[rstest]
#[case::attached(get_good, PositionalDataCode::OK)]
#[case::refused(get_bare, PositionalDataCode::ERROR_TEMP)]
fn primary_try_lock_maps_to_positional_codes(
    #[case] factory: extern "C" fn() -> *const LegacyPlugin,
    #[case] expected: PositionalDataCode,
) {
    let adapter = LegacyAdapter::resolve(&table(factory)).expect("valid legacy plugin");
    assert_eq!(adapter.init_positional_data(&[ProcessInfo::new("game", 9)]), expected);
    assert_eq!(take_events(), vec!["trylock".to_owned()]);
}

#[test]
fn extended_try_lock_receives_processes_sorted_by_name() {
    let symbols =
        table(get_good).with(symbols::GET_PLUGIN_2, get_extended as *const c_void);
    let adapter = LegacyAdapter::resolve(&symbols).expect("valid legacy plugin");
    let processes = [
        ProcessInfo::new("zsh", 1),
        ProcessInfo::new("game", 30),
        ProcessInfo::new("audio", 7),
        ProcessInfo::new("game", 12),
    ];

    assert_eq!(adapter.init_positional_data(&processes), PositionalDataCode::OK);

    assert_eq!(
        take_events(),
        vec!["audio:7", "game:30", "game:12", "zsh:1"]
    );
    assert_eq!(adapter.version(), Version::new(2, 0, 0));
}

#[test]
fn fetch_copies_buffers_only_when_they_change() {
    let adapter = LegacyAdapter::resolve(&table(get_good)).expect("valid legacy plugin");
    let mut data = PositionalData::new();

    assert!(adapter.fetch_positional_data(&mut data));
    assert!(adapter.fetch_positional_data(&mut data));
    assert_eq!(adapter.cache_replacements(), (1, 1));
    assert_eq!(data.context(), "match-1");
    assert_eq!(data.identity(), "hero");
    assert_eq!(data.avatar_position(), Vector3::new(4.0, 5.0, 6.0));

    SECOND_CONTEXT.with(|flag| flag.set(true));
    assert!(adapter.fetch_positional_data(&mut data));
    assert_eq!(adapter.cache_replacements(), (2, 1));
    assert_eq!(data.context(), "match-2");
}

#[test]
fn fetch_without_callback_zeroes_snapshot() {
    let adapter = LegacyAdapter::resolve(&table(get_bare)).expect("valid legacy plugin");
    let mut data = PositionalData::new().with_avatar(
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::ZERO,
        Vector3::ZERO,
    );
    assert!(!adapter.fetch_positional_data(&mut data));
    assert!(data.is_zeroed());
}

#[test]
fn shutdown_positional_data_unlocks() {
    let adapter = LegacyAdapter::resolve(&table(get_good)).expect("valid legacy plugin");
    adapter.shutdown_positional_data();
    assert_eq!(take_events(), vec!["unlock".to_owned()]);
}

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

#[test]
fn dialog_struct_takes_precedence_over_primary_hooks() {
    let symbols = table(get_good).with(symbols::GET_PLUGIN_QT, get_dialogs as *const c_void);
    let adapter = LegacyAdapter::resolve(&symbols).expect("valid legacy plugin");
    assert!(adapter.show_about_dialog(std::ptr::null_mut()));
    assert!(adapter.show_config_dialog(std::ptr::null_mut()));
    assert_eq!(take_events(), vec!["qt about", "qt config"]);
}

#[test]
fn primary_hooks_are_used_without_dialog_struct() {
    let adapter = LegacyAdapter::resolve(&table(get_good)).expect("valid legacy plugin");
    assert!(adapter.provides_about_dialog());
    assert!(!adapter.provides_config_dialog());
    assert!(adapter.show_about_dialog(std::ptr::null_mut()));
    assert!(!adapter.show_config_dialog(std::ptr::null_mut()));
    assert_eq!(take_events(), vec!["primary about".to_owned()]);
}

// ---------------------------------------------------------------------------
// Through the plugin instance
// ---------------------------------------------------------------------------

#[test]
fn legacy_plugin_behaves_like_a_positional_plugin() {
    let ids = PluginIdAllocator::new();
    let plugin = Plugin::built_in(Box::new(table(get_good)), AbiGeneration::Legacy, &ids)
        .expect("valid legacy plugin");

    assert_eq!(plugin.name(), "Demo");
    assert_eq!(plugin.author(), "Unknown");
    assert_eq!(plugin.features(), PluginFeatures::POSITIONAL);
    assert_eq!(plugin.api_version(), Version::UNKNOWN);
    assert_eq!(plugin.init(), lyre_plugin_abi::ErrorCode::OK);

    assert_eq!(plugin.init_positional_data(&[]), PositionalDataCode::OK);
    assert!(plugin.is_positional_data_active());
    take_events();

    plugin.shutdown();
    assert_eq!(take_events(), vec!["unlock".to_owned()]);
    assert!(!plugin.is_positional_data_active());
}

#[test]
fn legacy_plugin_is_rejected_by_the_current_abi() {
    let ids = PluginIdAllocator::new();
    let error = Plugin::built_in(Box::new(table(get_good)), AbiGeneration::Current, &ids)
        .expect_err("no current-ABI entry points");
    assert!(matches!(error, PluginError::MissingSymbol { .. }), "{error}");
}
