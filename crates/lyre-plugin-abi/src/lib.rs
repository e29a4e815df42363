//! C ABI shared between the Lyre plugin host and native plugins.
//!
//! Plugins are shared libraries exporting a fixed set of `extern "C"`
//! symbols. Two generations of that contract exist:
//!
//! - the **current** ABI, where every capability is a separately exported
//!   function (see [`current`]), and
//! - the **legacy** ABI, where a plugin exports factory functions returning
//!   pointers to C structs holding magic numbers, wide strings, and callbacks
//!   (see [`legacy`]).
//!
//! This crate only describes the wire shapes. Loading, validation, and
//! lifecycle live in `lyre-plugins`.

pub mod codes;
pub mod current;
pub mod features;
pub mod host;
pub mod legacy;
pub mod version;


pub use self::codes::{ErrorCode, PositionalDataCode, TalkingState, TransmissionMode};
pub use self::features::PluginFeatures;
pub use self::host::HostApi;
pub use self::version::Version;

/// Identifier the host assigns to a loaded plugin. Never reused while the
/// allocator that handed it out is alive.
pub type PluginId = u32;

/// Identifier of a server connection.
pub type ConnectionId = i32;

/// Identifier of a user on a server connection.
pub type UserId = u32;

/// Identifier of a channel on a server connection.
pub type ChannelId = i32;
