//! Where the probe's registry gets its processes and built-in plugins from.

use lyre_config::Config;
use lyre_plugins::{PluginDirectories, PluginRegistry, ProcessSource, SystemProcesses};

/// Collaborators used to assemble a [`PluginRegistry`].
pub trait HostEnvironment {
    /// Process table offered to positional data plugins.
    fn process_source(&self) -> Box<dyn ProcessSource>;

    /// Registers plugins compiled into the host. None by default.
    fn register_built_ins(&self, _registry: &mut PluginRegistry) {}
}

/// Reads the real process table and has no built-in plugins.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl HostEnvironment for SystemEnvironment {
    fn process_source(&self) -> Box<dyn ProcessSource> {
        Box::new(SystemProcesses)
    }
}

/// Plugin directories named by `config`.
#[must_use]
pub fn plugin_directories(config: &Config) -> PluginDirectories {
    PluginDirectories::new(
        config
            .system_plugin_dir()
            .map(|dir| dir.clone().into_std_path_buf()),
        config
            .user_plugin_dir()
            .map(|dir| dir.clone().into_std_path_buf()),
    )
}

/// Builds an unscanned registry for `config`.
#[must_use]
pub fn build_registry(config: &Config, environment: &dyn HostEnvironment) -> PluginRegistry {
    let mut registry = PluginRegistry::with_process_source(
        plugin_directories(config),
        environment.process_source(),
    );
    registry.set_positional_data_default(config.positional_data_enabled());
    environment.register_built_ins(&mut registry);
    registry
}
