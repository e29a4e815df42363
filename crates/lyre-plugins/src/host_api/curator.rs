//! Tracks memory handed to plugins until they give it back.
//!
//! Strings and ID arrays returned through the host API are owned by the
//! curator, keyed by address. `freeMemory` drops the matching allocation;
//! an address the curator never handed out is reported as
//! [`ErrorCode::POINTER_NOT_FOUND`].

use std::collections::BTreeMap;
use std::ffi::{CString, c_char, c_void};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lyre_plugin_abi::{ChannelId, ErrorCode, UserId};

enum Allocation {
    Text(CString),
    Users(Box<[UserId]>),
    Channels(Box<[ChannelId]>),
}

static ALLOCATIONS: Mutex<BTreeMap<usize, Allocation>> = Mutex::new(BTreeMap::new());

fn allocations() -> MutexGuard<'static, BTreeMap<usize, Allocation>> {
    ALLOCATIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hands out a NUL-terminated copy of `text`.
///
/// Text containing an interior NUL cannot be represented and yields
/// [`ErrorCode::GENERIC_ERROR`].
pub(crate) fn hand_out_text(text: String) -> Result<*const c_char, ErrorCode> {
    let text = CString::new(text).map_err(|_| ErrorCode::GENERIC_ERROR)?;
    let pointer = text.as_ptr();
    allocations().insert(pointer.addr(), Allocation::Text(text));
    Ok(pointer)
}

/// Hands out a user ID array. An empty list is reported as a null pointer
/// and is not tracked.
pub(crate) fn hand_out_users(users: Vec<UserId>) -> (*const UserId, usize) {
    if users.is_empty() {
        return (std::ptr::null(), 0);
    }
    let users = users.into_boxed_slice();
    let (pointer, count) = (users.as_ptr(), users.len());
    allocations().insert(pointer.addr(), Allocation::Users(users));
    (pointer, count)
}

/// Hands out a channel ID array. An empty list is reported as a null
/// pointer and is not tracked.
pub(crate) fn hand_out_channels(channels: Vec<ChannelId>) -> (*const ChannelId, usize) {
    if channels.is_empty() {
        return (std::ptr::null(), 0);
    }
    let channels = channels.into_boxed_slice();
    let (pointer, count) = (channels.as_ptr(), channels.len());
    allocations().insert(pointer.addr(), Allocation::Channels(channels));
    (pointer, count)
}

/// Releases an allocation previously handed out.
pub(crate) fn release(pointer: *const c_void) -> ErrorCode {
    match allocations().remove(&pointer.addr()) {
        Some(Allocation::Text(_) | Allocation::Users(_) | Allocation::Channels(_)) => ErrorCode::OK,
        None => ErrorCode::POINTER_NOT_FOUND,
    }
}

/// Number of allocations plugins have not released yet.
#[must_use]
pub fn outstanding_allocations() -> usize {
    allocations().len()
}
