//! Symbol lookup behind a trait seam.
//!
//! [`LibraryResolver`] looks symbols up in a dynamic library loaded with
//! `libloading`. [`StaticSymbols`] maps names to addresses compiled into the
//! host, which is how built-in plugins (and tests) provide entry points
//! without a library on disk. Plugin code only ever sees
//! [`SymbolResolver`].

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use libloading::{Library, Symbol};

use crate::error::PluginError;

/// Non-null address of an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAddress(NonNull<c_void>);

// SAFETY: the address is only dereferenced by calling it as a function or
// reading the static struct it points at; both stay valid for as long as the
// resolver that produced it is alive, and the owning `Plugin` keeps that
// resolver alive longer than any copy of the address.
unsafe impl Send for SymbolAddress {}
unsafe impl Sync for SymbolAddress {}

impl SymbolAddress {
    /// Wraps a raw address, rejecting null.
    #[must_use]
    pub fn new(address: *const c_void) -> Option<Self> {
        NonNull::new(address.cast_mut()).map(Self)
    }

    /// Returns the raw address.
    #[must_use]
    pub const fn as_ptr(self) -> *const c_void {
        self.0.as_ptr().cast_const()
    }

    /// Reinterprets the address as a function pointer of type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be the exact `extern "C"` function pointer type the symbol was
    /// exported with.
    pub(crate) unsafe fn cast<F: Copy>(self) -> F {
        const {
            assert!(size_of::<F>() == size_of::<*mut c_void>());
        }
        let raw = self.0.as_ptr();
        // SAFETY: sizes match (checked above) and the caller guarantees the
        // type is the symbol's real signature.
        unsafe { std::mem::transmute_copy::<*mut c_void, F>(&raw) }
    }
}

/// Source of exported symbols for one plugin.
pub trait SymbolResolver: Send + Sync {
    /// Looks up `name`, returning `None` when it is not exported.
    fn resolve(&self, name: &str) -> Option<SymbolAddress>;

    /// Library path, or `None` for symbols compiled into the host.
    fn path(&self) -> Option<&Path>;

    /// Human-readable label used in logs and errors.
    fn origin(&self) -> String;
}

/// Looks `name` up and reinterprets it as the function pointer type `F`.
///
/// # Safety
///
/// `F` must be the exact `extern "C"` signature of the symbol `name`.
pub(crate) unsafe fn resolve_fn<F: Copy>(resolver: &dyn SymbolResolver, name: &str) -> Option<F> {
    // SAFETY: forwarded to the caller.
    resolver.resolve(name).map(|address| unsafe { address.cast::<F>() })
}

/// Symbols exported by a dynamic library on disk.
pub struct LibraryResolver {
    library: Library,
    path: PathBuf,
}

impl LibraryResolver {
    /// Loads the library at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] when the platform loader rejects the file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PluginError> {
        let path = path.into();
        // SAFETY: loading a library runs its initialisers. Plugin directories
        // are trusted by the operator, which is the same trust the host
        // extends to any native plugin.
        let library = unsafe { Library::new(&path) }.map_err(|source| PluginError::Load {
            path: path.clone(),
            source: Arc::new(source),
        })?;
        Ok(Self { library, path })
    }
}

impl SymbolResolver for LibraryResolver {
    fn resolve(&self, name: &str) -> Option<SymbolAddress> {
        // SAFETY: the symbol is read as an untyped address; it is only given a
        // type by `SymbolAddress::cast`, whose caller vouches for it.
        let symbol: Symbol<'_, *mut c_void> = unsafe { self.library.get(name.as_bytes()) }.ok()?;
        SymbolAddress::new((*symbol).cast_const())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

impl fmt::Debug for LibraryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryResolver")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Symbol table compiled into the host.
///
/// # Example
///
/// ```
/// use std::ffi::c_void;
/// use lyre_plugins::resolver::{StaticSymbols, SymbolResolver};
///
/// extern "C" fn shutdown() {}
///
/// let symbols = StaticSymbols::new("demo").with("shutdown", shutdown as *const c_void);
/// assert!(symbols.resolve("shutdown").is_some());
/// assert!(symbols.resolve("init").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSymbols {
    name: String,
    symbols: HashMap<String, SymbolAddress>,
}

impl StaticSymbols {
    /// Creates an empty table labelled `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: HashMap::new(),
        }
    }

    /// Adds (or replaces) a symbol. Null addresses are ignored.
    #[must_use]
    pub fn with(mut self, symbol: impl Into<String>, address: *const c_void) -> Self {
        if let Some(resolved) = SymbolAddress::new(address) {
            self.symbols.insert(symbol.into(), resolved);
        }
        self
    }

    /// Removes a symbol.
    #[must_use]
    pub fn without(mut self, symbol: &str) -> Self {
        self.symbols.remove(symbol);
        self
    }

    /// Returns the number of symbols in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for StaticSymbols {
    fn resolve(&self, name: &str) -> Option<SymbolAddress> {
        self.symbols.get(name).copied()
    }

    fn path(&self) -> Option<&Path> {
        None
    }

    fn origin(&self) -> String {
        self.name.clone()
    }
}
