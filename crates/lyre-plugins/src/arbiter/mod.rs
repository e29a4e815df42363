//! Selection of the single positional data provider.
//!
//! The [`PositionalDataArbiter`] is either idle or holds one active provider.
//! Arbitration offers the running processes to every eligible plugin in
//! registry order and keeps the first one that accepts.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use lyre_plugin_abi::{PluginId, PositionalDataCode};
use tracing::{debug, info};

use crate::plugin::Plugin;
use crate::process::ProcessSource;

/// Tracing target for arbitration.
const ARBITER_TARGET: &str = "lyre_plugins::arbiter";

/// Chooses and tracks the active positional data provider.
pub struct PositionalDataArbiter {
    processes: Box<dyn ProcessSource>,
    active: RwLock<Option<Arc<Plugin>>>,
}

impl PositionalDataArbiter {
    /// Creates an idle arbiter that lists processes from `processes`.
    #[must_use]
    pub fn new(processes: Box<dyn ProcessSource>) -> Self {
        Self {
            processes,
            active: RwLock::new(None),
        }
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, Option<Arc<Plugin>>> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The active provider, if any.
    #[must_use]
    pub fn active(&self) -> Option<Arc<Plugin>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a provider is active.
    #[must_use]
    pub fn has_active(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Selects a provider among `plugins`, visited in the given order.
    ///
    /// Returns the current provider unchanged when one is already active.
    /// Plugins that are not loaded or not enabled for positional data are
    /// skipped. A plugin answering [`PositionalDataCode::ERROR_PERM`] has its
    /// positional data disabled; any other non-OK answer leaves it eligible
    /// for the next round.
    pub fn arbitrate(&self, plugins: &[Arc<Plugin>]) -> Option<Arc<Plugin>> {
        let mut active = self.write_active();
        if let Some(current) = active.as_ref() {
            return Some(Arc::clone(current));
        }

        let eligible: Vec<&Arc<Plugin>> = plugins
            .iter()
            .filter(|plugin| plugin.is_loaded() && plugin.is_positional_data_enabled())
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let processes = self.processes.processes();
        for plugin in eligible {
            let code = plugin.init_positional_data(&processes);
            if code == PositionalDataCode::OK {
                info!(
                    target: ARBITER_TARGET,
                    plugin_id = plugin.id(),
                    name = %plugin.name(),
                    "positional data provider selected"
                );
                *active = Some(Arc::clone(plugin));
                return active.clone();
            }
            if code == PositionalDataCode::ERROR_PERM {
                debug!(
                    target: ARBITER_TARGET,
                    plugin_id = plugin.id(),
                    "plugin declined positional data permanently"
                );
                plugin.enable_positional_data(false);
            }
        }
        None
    }

    /// Shuts the active provider's positional data down and returns to idle.
    pub fn release(&self) {
        if let Some(plugin) = self.write_active().take() {
            plugin.shutdown_positional_data();
            debug!(
                target: ARBITER_TARGET,
                plugin_id = plugin.id(),
                "positional data provider released"
            );
        }
    }

    /// Releases the active provider only if it is plugin `id`. Returns
    /// whether it was.
    pub fn release_if(&self, id: PluginId) -> bool {
        let mut active = self.write_active();
        if active.as_ref().is_none_or(|plugin| plugin.id() != id) {
            return false;
        }
        if let Some(plugin) = active.take() {
            plugin.shutdown_positional_data();
            debug!(
                target: ARBITER_TARGET,
                plugin_id = id,
                "positional data provider released"
            );
        }
        true
    }
}

impl fmt::Debug for PositionalDataArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionalDataArbiter")
            .field("active", &self.active().map(|plugin| plugin.id()))
            .finish_non_exhaustive()
    }
}
