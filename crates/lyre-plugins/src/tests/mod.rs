//! Crate-level integration and BDD tests.

use std::sync::Arc;

use crate::plugin::AbiGeneration;
use crate::process::{FixedProcesses, ProcessInfo};
use crate::registry::{PluginDirectories, PluginRegistry};
use crate::resolver::SymbolResolver;
use crate::test_support::{FakePlugin, PositionalAnswer, reset_journal};


/// Registry whose built-ins are `fakes`, registered in order.
fn registry_with(fakes: Vec<FakePlugin>) -> PluginRegistry {
    let mut registry = PluginRegistry::with_process_source(
        PluginDirectories::default(),
        Box::new(FixedProcesses::new(vec![
            ProcessInfo::new("launcher", 12),
            ProcessInfo::new("game", 4040),
        ])),
    );
    for (index, fake) in fakes.into_iter().enumerate() {
        registry.register_built_in(
            format!("built-in-{index}"),
            AbiGeneration::Current,
            Box::new(move || -> Box<dyn SymbolResolver> { Box::new(fake.clone().symbols()) }),
        );
    }
    registry
}

#[test]
fn end_to_end_tick_with_built_in_provider() {
    reset_journal();
    let registry = registry_with(vec![
        FakePlugin::full("audio-only"),
        FakePlugin::full("game").positional(PositionalAnswer::Ok),
    ]);

    assert_eq!(registry.rescan_plugins(), 2);
    assert!(registry.fetch_positional_data());

    let provider = registry
        .active_positional_data_plugin()
        .expect("provider selected");
    assert_eq!(provider.id(), 2);
    let info = provider.info();
    assert_eq!(info.name, "Fake plugin");
    assert_eq!(info.version, "1.2.3");
    assert!(info.loaded);
    assert!(info.positional_data_active);

    let pose = registry.positional_data();
    assert_eq!(pose.identity(), "player-one");

    // The audio-only plugin refused permanently and is out of the running.
    let audio_only = registry.plugin(1).expect("registered");
    assert!(!audio_only.is_positional_data_enabled());
}

#[test]
fn snapshot_readers_get_independent_copies() {
    reset_journal();
    let registry = Arc::new(registry_with(vec![
        FakePlugin::minimal("game").positional(PositionalAnswer::Ok),
    ]));
    registry.rescan_plugins();
    registry.fetch_positional_data();

    let reader = Arc::clone(&registry);
    let copy = std::thread::spawn(move || reader.positional_data())
        .join()
        .expect("reader thread");

    assert_eq!(copy, registry.positional_data());
    assert!(!copy.is_zeroed());
}
