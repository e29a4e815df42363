//! Change-detecting copies of plugin-owned buffers.

/// Owned copy of a buffer a plugin hands out on every fetch.
///
/// Legacy plugins return the same context and identity on almost every
/// tick. The cache compares the incoming units with its copy and only
/// reallocates (and re-decodes the text) when they differ.
#[derive(Debug)]
pub(crate) struct ChangeCache<E> {
    units: Vec<E>,
    text: String,
    replacements: usize,
    decode: fn(&[E]) -> String,
}

impl<E: Copy + PartialEq> ChangeCache<E> {
    pub(crate) const fn new(decode: fn(&[E]) -> String) -> Self {
        Self {
            units: Vec::new(),
            text: String::new(),
            replacements: 0,
            decode,
        }
    }

    /// Stores `incoming` if it differs from the cached copy. Returns `true`
    /// when the cache changed.
    pub(crate) fn refresh(&mut self, incoming: &[E]) -> bool {
        if self.units.as_slice() == incoming {
            return false;
        }
        self.units = incoming.to_vec();
        self.text = (self.decode)(&self.units);
        self.replacements += 1;
        true
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Number of times the buffer was reallocated.
    pub(crate) const fn replacements(&self) -> usize {
        self.replacements
    }
}

/// Decodes a context buffer, which is UTF-8 by convention but not checked by
/// the plugin.
pub(crate) fn decode_context(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
