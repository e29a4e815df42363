//! Integer codes crossing the plugin boundary.
//!
//! Each code is a transparent newtype over the C integer rather than a Rust
//! enum: plugins are foreign code and may return values outside the known
//! set, which would be undefined behaviour for a `#[repr(C)] enum`.

use std::fmt;

/// Status returned by plugin and host API calls.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Unspecified failure.
    pub const GENERIC_ERROR: Self = Self(-1);
    /// Success.
    pub const OK: Self = Self(0);
    /// `freeMemory` was handed a pointer the host never allocated.
    pub const POINTER_NOT_FOUND: Self = Self(1);
    /// The host is not connected to any server.
    pub const NO_ACTIVE_CONNECTION: Self = Self(2);
    /// The referenced user does not exist.
    pub const USER_NOT_FOUND: Self = Self(3);
    /// The referenced channel does not exist.
    pub const CHANNEL_NOT_FOUND: Self = Self(4);
    /// The referenced connection does not exist.
    pub const CONNECTION_NOT_FOUND: Self = Self(5);
    /// The transmission mode value is not recognised.
    pub const UNKNOWN_TRANSMISSION_MODE: Self = Self(6);
    /// No log sink is available.
    pub const LOGGER_NOT_AVAILABLE: Self = Self(7);
    /// Audio output is not available.
    pub const AUDIO_NOT_AVAILABLE: Self = Self(8);
    /// The sample file could not be played.
    pub const INVALID_SAMPLE: Self = Self(9);

    /// Returns `true` for [`ErrorCode::OK`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            Self::GENERIC_ERROR => "generic error",
            Self::OK => "ok",
            Self::POINTER_NOT_FOUND => "pointer not found",
            Self::NO_ACTIVE_CONNECTION => "no active connection",
            Self::USER_NOT_FOUND => "user not found",
            Self::CHANNEL_NOT_FOUND => "channel not found",
            Self::CONNECTION_NOT_FOUND => "connection not found",
            Self::UNKNOWN_TRANSMISSION_MODE => "unknown transmission mode",
            Self::LOGGER_NOT_AVAILABLE => "logger not available",
            Self::AUDIO_NOT_AVAILABLE => "audio not available",
            Self::INVALID_SAMPLE => "invalid sample",
            Self(other) => return write!(f, "unknown status {other}"),
        };
        f.write_str(label)
    }
}

/// Answer to `initPositionalData`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionalDataCode(pub u8);

impl PositionalDataCode {
    /// The plugin found its game and will provide positional data.
    pub const OK: Self = Self(0);
    /// Not now; ask again on a later arbitration.
    pub const ERROR_TEMP: Self = Self(1);
    /// Never ask again during this session.
    pub const ERROR_PERM: Self = Self(2);
}

impl fmt::Display for PositionalDataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OK => f.write_str("ok"),
            Self::ERROR_TEMP => f.write_str("temporary error"),
            Self::ERROR_PERM => f.write_str("permanent error"),
            Self(other) => write!(f, "unknown code {other}"),
        }
    }
}

/// Talking state of a user, as reported to `onUserTalkingStateChanged`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TalkingState(pub i32);

impl TalkingState {
    /// No valid state.
    pub const INVALID: Self = Self(-1);
    /// Silent.
    pub const PASSIVE: Self = Self(0);
    /// Talking normally.
    pub const TALKING: Self = Self(1);
    /// Whispering.
    pub const WHISPERING: Self = Self(2);
    /// Shouting.
    pub const SHOUTING: Self = Self(3);
}

/// How the local user's microphone is gated.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransmissionMode(pub i32);

impl TransmissionMode {
    /// Always transmitting.
    pub const CONTINUOUS: Self = Self(0);
    /// Transmitting while voice activity is detected.
    pub const VOICE_ACTIVATION: Self = Self(1);
    /// Transmitting while the push-to-talk key is held.
    pub const PUSH_TO_TALK: Self = Self(2);

    /// Returns `true` for the three modes the host understands.
    #[must_use]
    pub const fn is_known(self) -> bool {
        matches!(self.0, 0..=2)
    }
}
