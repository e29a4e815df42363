//! Semantic version triple exchanged across the plugin boundary.

use std::fmt;

/// A `major.minor.patch` version passed by value through the C ABI.
///
/// Components are signed because plugins report `-1.-1.-1` when they do not
/// declare an API version at all.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: i32,
    /// Minor component.
    pub minor: i32,
    /// Patch component.
    pub patch: i32,
}

impl Version {
    /// Version reported by plugins that never declare one.
    pub const UNKNOWN: Self = Self::new(-1, -1, -1);

    /// `0.0.0`.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Plugin API version implemented by this host.
    pub const PLUGIN_API: Self = Self::new(1, 0, 0);

    /// Oldest plugin API version this host still accepts.
    pub const MINIMUM_PLUGIN_API: Self = Self::new(1, 0, 0);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns `true` when `other` has the same major and minor components.
    #[must_use]
    pub const fn same_feature_level(self, other: Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
