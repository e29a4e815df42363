//! Bridge from the struct-based legacy ABI to the plugin operations.
//!
//! A [`LegacyAdapter`] is built from the structs returned by the legacy
//! factory functions. It answers the same questions a current-ABI entry
//! point table does, translating wide strings, process lists, and the
//! legacy lock/fetch protocol on the way.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Mutex, PoisonError};

use lyre_plugin_abi::{PositionalDataCode, Version};
use lyre_plugin_abi::legacy::{
    self, DialogFn, GetPlugin2Fn, GetPluginFn, GetPluginQtFn, LegacyPlugin, LegacyPlugin2,
    LegacyPluginQt, LegacyProcessEntry, WideChar,
};
use tracing::debug;

use crate::error::PluginError;
use crate::plugin::defaults;
use crate::positional::PositionalData;
use crate::process::ProcessInfo;
use crate::resolver::{SymbolResolver, resolve_fn};

mod cache;
pub(crate) mod wide;

use self::cache::{ChangeCache, decode_context};

/// Tracing target for legacy plugin operations.
const LEGACY_TARGET: &str = "lyre_plugins::legacy";

/// Pointers to the plugin's static structs.
struct LegacyTables {
    primary: NonNull<LegacyPlugin>,
    extended: Option<NonNull<LegacyPlugin2>>,
    dialogs: Option<NonNull<LegacyPluginQt>>,
}

// SAFETY: the structs are static data inside the plugin library, which the
// owning `Plugin` keeps loaded for the adapter's whole life. The adapter only
// reads them; calls into the plugin are serialised by the plugin's lock.
unsafe impl Send for LegacyTables {}
unsafe impl Sync for LegacyTables {}

/// Owned copies of the fetch buffers.
struct FetchCaches {
    context: ChangeCache<u8>,
    identity: ChangeCache<WideChar>,
}

/// Legacy plugin seen through the current plugin operations.
pub(crate) struct LegacyAdapter {
    tables: LegacyTables,
    name: String,
    description: String,
    caches: Mutex<FetchCaches>,
}

impl LegacyAdapter {
    /// Resolves and validates the legacy structs.
    ///
    /// The primary factory is mandatory, its struct must carry
    /// [`legacy::LEGACY_PLUGIN_MAGIC`], and its short name must not be the
    /// retracted marker.
    pub(crate) fn resolve(resolver: &dyn SymbolResolver) -> Result<Self, PluginError> {
        let origin = resolver.origin();
        // SAFETY: the legacy factories are exported with these signatures.
        let factory = unsafe { resolve_fn::<GetPluginFn>(resolver, legacy::symbols::GET_PLUGIN) }
            .ok_or_else(|| PluginError::MissingSymbol {
                origin: origin.clone(),
                symbol: legacy::symbols::GET_PLUGIN,
            })?;
        // SAFETY: as above; the factory returns a pointer to static data.
        let primary = NonNull::new(unsafe { factory() }.cast_mut()).ok_or_else(|| {
            PluginError::Invalid {
                origin: origin.clone(),
                reason: format!("{} returned null", legacy::symbols::GET_PLUGIN),
            }
        })?;
        // SAFETY: non-null pointer to the plugin's static struct.
        let primary_ref = unsafe { primary.as_ref() };

        if primary_ref.magic != legacy::LEGACY_PLUGIN_MAGIC {
            return Err(PluginError::LegacyMagicMismatch {
                origin,
                found: primary_ref.magic,
                expected: legacy::LEGACY_PLUGIN_MAGIC,
            });
        }

        // SAFETY: the struct's string fields are null or NUL-terminated.
        let short_name = unsafe { wide::to_string(primary_ref.short_name) };
        if short_name == legacy::RETRACTED_SHORT_NAME {
            return Err(PluginError::Retracted { origin });
        }

        // SAFETY: signatures as declared in the ABI crate.
        let extended = unsafe { resolve_fn::<GetPlugin2Fn>(resolver, legacy::symbols::GET_PLUGIN_2) }
            .and_then(|factory| NonNull::new(unsafe { factory() }.cast_mut()));
        // SAFETY: as above.
        let dialogs = unsafe { resolve_fn::<GetPluginQtFn>(resolver, legacy::symbols::GET_PLUGIN_QT) }
            .and_then(|factory| NonNull::new(unsafe { factory() }.cast_mut()));

        let description = Self::read_description(primary_ref);
        let name = if short_name.is_empty() {
            defaults::NAME.to_owned()
        } else {
            short_name
        };

        debug!(
            target: LEGACY_TARGET,
            origin = %origin,
            name = %name,
            extended = extended.is_some(),
            dialogs = dialogs.is_some(),
            "resolved legacy plugin"
        );

        Ok(Self {
            tables: LegacyTables {
                primary,
                extended,
                dialogs,
            },
            name,
            description,
            caches: Mutex::new(FetchCaches {
                context: ChangeCache::new(decode_context),
                identity: ChangeCache::new(wide::decode),
            }),
        })
    }

    fn read_description(primary: &LegacyPlugin) -> String {
        let long = primary
            .long_description
            // SAFETY: the callback returns null or a NUL-terminated string.
            .map(|callback| unsafe { wide::to_string(callback()) })
            .filter(|text| !text.is_empty());
        // SAFETY: null or NUL-terminated.
        let short = unsafe { wide::to_string(primary.description) };
        long.or_else(|| Some(short).filter(|text| !text.is_empty()))
            .unwrap_or_else(|| defaults::DESCRIPTION.to_owned())
    }

    const fn primary(&self) -> &LegacyPlugin {
        // SAFETY: see `LegacyTables`.
        unsafe { self.tables.primary.as_ref() }
    }

    const fn extended(&self) -> Option<&LegacyPlugin2> {
        match self.tables.extended {
            // SAFETY: see `LegacyTables`.
            Some(pointer) => Some(unsafe { pointer.as_ref() }),
            None => None,
        }
    }

    const fn dialogs(&self) -> Option<&LegacyPluginQt> {
        match self.tables.dialogs {
            // SAFETY: see `LegacyTables`.
            Some(pointer) => Some(unsafe { pointer.as_ref() }),
            None => None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    /// Struct revision as the major component: 1 for the primary struct
    /// alone, otherwise the extended struct's `version` field.
    pub(crate) fn version(&self) -> Version {
        let major = self
            .extended()
            .map_or(1, |extended| i32::try_from(extended.version).unwrap_or(i32::MAX));
        Version::new(major, 0, 0)
    }

    /// Offers the running processes to the plugin's try-lock.
    ///
    /// The extended struct receives the processes sorted by name; the primary
    /// try-lock receives nothing. A truthy answer is [`PositionalDataCode::OK`],
    /// anything else [`PositionalDataCode::ERROR_TEMP`].
    pub(crate) fn init_positional_data(&self, processes: &[ProcessInfo]) -> PositionalDataCode {
        let locked = if let Some(try_lock) = self.extended().and_then(|ext| ext.try_lock) {
            let mut names: Vec<(Vec<WideChar>, u64)> = processes
                .iter()
                .map(|process| (wide::encode(process.name()), process.pid()))
                .collect();
            names.sort_by(|left, right| left.0.cmp(&right.0));
            let entries: Vec<LegacyProcessEntry> = names
                .iter()
                .map(|(name, pid)| LegacyProcessEntry {
                    name: name.as_ptr(),
                    pid: *pid,
                })
                .collect();
            // SAFETY: `entries` and the names it points into outlive the call.
            unsafe { try_lock(entries.as_ptr(), entries.len()) }
        } else if let Some(try_lock) = self.primary().try_lock {
            // SAFETY: plugin callback with the declared signature.
            unsafe { try_lock() }
        } else {
            0
        };

        if locked == 0 {
            PositionalDataCode::ERROR_TEMP
        } else {
            PositionalDataCode::OK
        }
    }

    /// Fetches the pose, copying context and identity only when they changed.
    ///
    /// Returns the plugin's "still attached" answer. A plugin without a fetch
    /// callback gets a zeroed snapshot and `false`.
    pub(crate) fn fetch_positional_data(&self, data: &mut PositionalData) -> bool {
        let Some(fetch) = self.primary().fetch else {
            data.reset();
            return false;
        };

        let mut context: *const u8 = std::ptr::null();
        let mut context_len: usize = 0;
        let mut identity: *const WideChar = std::ptr::null();
        let [ap, af, at, cp, cf, ct] = data.vectors_mut().map(|vector| vector.as_mut_ptr());
        // SAFETY: each vector pointer addresses three floats; the out-pointers
        // are valid locals.
        let attached = unsafe {
            fetch(
                ap,
                af,
                at,
                cp,
                cf,
                ct,
                &raw mut context,
                &raw mut context_len,
                &raw mut identity,
            )
        } != 0;

        let context_bytes: &[u8] = if context.is_null() || context_len == 0 {
            &[]
        } else {
            // SAFETY: the plugin owns `context_len` bytes at `context` until its
            // next call, and the copy happens before that.
            unsafe { std::slice::from_raw_parts(context, context_len) }
        };
        // SAFETY: null or a NUL-terminated wide string owned by the plugin.
        let identity_units = unsafe { wide::terminated(identity) };

        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.context.refresh(context_bytes);
        caches.identity.refresh(identity_units);
        if data.context != caches.context.text() {
            data.context.clear();
            data.context.push_str(caches.context.text());
        }
        if data.identity != caches.identity.text() {
            data.identity.clear();
            data.identity.push_str(caches.identity.text());
        }
        attached
    }

    pub(crate) fn shutdown_positional_data(&self) {
        if let Some(unlock) = self.primary().unlock {
            // SAFETY: plugin callback with the declared signature.
            unsafe { unlock() };
        }
    }

    fn about_hook(&self) -> Option<DialogFn> {
        self.dialogs()
            .and_then(|dialogs| dialogs.about)
            .or(self.primary().about)
    }

    fn config_hook(&self) -> Option<DialogFn> {
        self.dialogs()
            .and_then(|dialogs| dialogs.config)
            .or(self.primary().config)
    }

    pub(crate) fn provides_about_dialog(&self) -> bool {
        self.about_hook().is_some()
    }

    pub(crate) fn provides_config_dialog(&self) -> bool {
        self.config_hook().is_some()
    }

    pub(crate) fn show_about_dialog(&self, parent: *mut c_void) -> bool {
        self.about_hook().is_some_and(|hook| {
            // SAFETY: plugin callback; the parent handle may be null.
            unsafe { hook(parent) };
            true
        })
    }

    pub(crate) fn show_config_dialog(&self, parent: *mut c_void) -> bool {
        self.config_hook().is_some_and(|hook| {
            // SAFETY: plugin callback; the parent handle may be null.
            unsafe { hook(parent) };
            true
        })
    }

    /// Buffer reallocation counts `(context, identity)`.
    #[cfg(test)]
    pub(crate) fn cache_replacements(&self) -> (usize, usize) {
        let caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        (
            caches.context.replacements(),
            caches.identity.replacements(),
        )
    }
}

impl fmt::Debug for LegacyAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyAdapter")
            .field("name", &self.name)
            .field("extended", &self.tables.extended.is_some())
            .field("dialogs", &self.tables.dialogs.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
