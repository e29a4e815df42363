//! Feature bitmask advertised by `getPluginFeatures`.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of optional capabilities a plugin implements.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PluginFeatures(u32);

impl PluginFeatures {
    /// No optional features.
    pub const NONE: Self = Self(0);
    /// Provides positional audio data.
    pub const POSITIONAL: Self = Self(1);
    /// Processes audio buffers.
    pub const AUDIO: Self = Self(1 << 1);

    /// Wraps a raw bitmask; unknown bits are preserved.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PluginFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PluginFeatures {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PluginFeatures {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for PluginFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut names = Vec::new();
        if self.contains(Self::POSITIONAL) {
            names.push("positional");
        }
        if self.contains(Self::AUDIO) {
            names.push("audio");
        }
        let mut text = names.join("+");
        let unknown = self.0 & !(Self::POSITIONAL.0 | Self::AUDIO.0);
        if unknown != 0 {
            if !text.is_empty() {
                text.push('+');
            }
            text.push_str(&format!("{unknown:#x}"));
        }
        f.write_str(&text)
    }
}
