//! Plugin identifier allocation.

use std::sync::{Mutex, PoisonError};

use lyre_plugin_abi::PluginId;

/// Hands out strictly increasing plugin IDs, starting at 1.
///
/// The registry owns one allocator; IDs are never reused while it lives,
/// including IDs of plugins that failed validation after loading.
#[derive(Debug)]
pub struct PluginIdAllocator {
    next: Mutex<PluginId>,
}

impl PluginIdAllocator {
    /// First ID handed out.
    pub const FIRST: PluginId = 1;

    /// Creates an allocator whose next ID is [`PluginIdAllocator::FIRST`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(Self::FIRST),
        }
    }

    /// Returns the next ID.
    pub fn allocate(&self) -> PluginId {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);
        id
    }
}

impl Default for PluginIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
