//! Conversions between Rust strings and platform wide strings.

use lyre_plugin_abi::legacy::WideChar;

/// Upper bound on the length of a wide string read from a plugin. Protects
/// against unterminated buffers.
const MAX_WIDE_LEN: usize = 64 * 1024;

/// Encodes `text` as a NUL-terminated wide string.
pub(crate) fn encode(text: &str) -> Vec<WideChar> {
    let mut units: Vec<WideChar> = encode_units(text);
    units.push(0);
    units
}

#[cfg(windows)]
fn encode_units(text: &str) -> Vec<WideChar> {
    text.encode_utf16().collect()
}

#[cfg(not(windows))]
fn encode_units(text: &str) -> Vec<WideChar> {
    text.chars().map(u32::from).collect()
}

/// Decodes wide units, replacing invalid sequences with U+FFFD.
#[cfg(windows)]
pub(crate) fn decode(units: &[WideChar]) -> String {
    String::from_utf16_lossy(units)
}

/// Decodes wide units, replacing invalid code points with U+FFFD.
#[cfg(not(windows))]
pub(crate) fn decode(units: &[WideChar]) -> String {
    units
        .iter()
        .map(|&unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Borrows the units of a NUL-terminated wide string, without the terminator.
///
/// Null yields an empty slice.
///
/// # Safety
///
/// `pointer` must be null or point at a readable wide string terminated
/// within [`MAX_WIDE_LEN`] units, which stays valid and unmodified for `'a`.
pub(crate) unsafe fn terminated<'a>(pointer: *const WideChar) -> &'a [WideChar] {
    if pointer.is_null() {
        return &[];
    }
    let mut len = 0;
    // SAFETY: the caller guarantees readability up to the terminator.
    while len < MAX_WIDE_LEN && unsafe { pointer.add(len).read() } != 0 {
        len += 1;
    }
    // SAFETY: the first `len` units were just read.
    unsafe { std::slice::from_raw_parts(pointer, len) }
}

/// Decodes a NUL-terminated wide string into an owned `String`.
///
/// # Safety
///
/// Same contract as [`terminated`].
pub(crate) unsafe fn to_string(pointer: *const WideChar) -> String {
    // SAFETY: forwarded to the caller.
    decode(unsafe { terminated(pointer) })
}
