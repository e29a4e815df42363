//! Native plugin host for Lyre.
//!
//! The `lyre-plugins` crate loads third-party shared libraries that extend
//! the voice client: positional audio providers that read a game's avatar
//! and camera pose, and audio or event hooks that see the client's sample
//! buffers and server events. Plugins speak the C ABI described in
//! `lyre-plugin-abi`, in either its current or its legacy generation.
//!
//! # Architecture
//!
//! The [`PluginRegistry`] scans a system and a user plugin directory, builds
//! a [`Plugin`] for every library that validates under one of the two ABI
//! generations, and keys them by ID. A [`Plugin`] resolves its entry points
//! through a [`SymbolResolver`](resolver::SymbolResolver), which is either a
//! loaded library or a symbol table compiled into the host. Legacy plugins
//! are driven through an internal adapter that translates their struct-based
//! protocol.
//!
//! On every audio tick the host calls
//! [`PluginRegistry::fetch_positional_data`]. The registry's
//! [`PositionalDataArbiter`] offers the running processes (from a
//! [`ProcessSource`]) to the enabled plugins, keeps the first that accepts,
//! and fetches its pose into a shared [`PositionalData`] snapshot until it
//! asks to stop.
//!
//! Plugins call back into the host through the [`HostApi`] table built by
//! [`host_api::host_api_for`], which answers from the installed
//! [`HostBridge`].
//!
//! # Example
//!
//! ```rust,no_run
//! use lyre_plugins::{PluginDirectories, PluginRegistry};
//!
//! let registry = PluginRegistry::new(PluginDirectories::new(
//!     Some("/usr/lib/lyre/plugins".into()),
//!     None,
//! ));
//! registry.rescan_plugins();
//! for plugin in registry.plugins(true) {
//!     println!("{}: {}", plugin.id(), plugin.name());
//! }
//! if registry.fetch_positional_data() {
//!     let pose = registry.positional_data();
//!     println!("avatar at {:?}", pose.avatar_position());
//! }
//! ```
//!
//! [`HostApi`]: lyre_plugin_abi::HostApi

pub mod arbiter;
pub mod error;
pub mod host_api;
pub mod installer;
mod legacy;
pub mod plugin;
pub mod positional;
pub mod process;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use self::arbiter::PositionalDataArbiter;
pub use self::error::PluginError;
pub use self::host_api::{
    HostBridge, PLUGIN_LOG_TARGET, clear_host_bridge, install_host_bridge,
};
pub use self::installer::{PluginInstaller, PreparedInstall};
pub use self::plugin::{AbiGeneration, Plugin, PluginIdAllocator, PluginInfo, PluginSource};
pub use self::positional::{PositionalData, Vector3};
pub use self::process::{FixedProcesses, ProcessInfo, ProcessSource, SystemProcesses};
pub use self::registry::{PluginDirectories, PluginRegistry};
