//! Resolving a filter's entry point.

use std::collections::HashMap;

use libloading::{Library, Symbol};

use crate::abi::EntryPoint;
use crate::error::{Error, Result};
use crate::plugin::PluginRecord;

/// A resolved entry point and whatever keeps it callable.
///
/// The library, if any, stays loaded for as long as this value lives.
pub struct LoadedModule {
    entry: EntryPoint,
    library: Option<Library>,
}

impl LoadedModule {
    /// Wrap an entry point that lives in this binary.
    pub fn from_entry(entry: EntryPoint) -> Self {
        Self {
            entry,
            library: None,
        }
    }

    /// The entry point.
    pub fn entry(&self) -> EntryPoint {
        self.entry
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("entry", &(self.entry as usize as *const ()))
            .field("native", &self.library.is_some())
            .finish()
    }
}

/// Source of entry points.
pub trait ModuleLoader {
    /// Resolve the entry point of `record`.
    fn load(&self, record: &PluginRecord) -> Result<LoadedModule>;
}

/// Loads modules from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn load(&self, record: &PluginRecord) -> Result<LoadedModule> {
        let path = record.path();
        tracing::debug!(path = %path.display(), entry = record.entry_point(), "loading module");

        // SAFETY: Loading a module runs its initializers. Only modules that
        // passed discovery reach this point; trusting them is the caller's
        // decision.
        let library = unsafe { Library::new(path) }
            .map_err(|e| Error::PluginLoad(format!("{}: {e}", path.display())))?;

        let mut symbol = record.entry_point().as_bytes().to_vec();
        symbol.push(0);
        // SAFETY: The symbol is a filter entry point with the `EntryPoint`
        // signature; the library outlives the copied pointer because both
        // move into `LoadedModule`.
        let entry = unsafe {
            let found: Symbol<EntryPoint> = library
                .get(&symbol)
                .map_err(|_| Error::MissingEntryPoint(record.entry_point().to_string()))?;
            *found
        };
        Ok(LoadedModule {
            entry,
            library: Some(library),
        })
    }
}

/// Entry points registered by name, for filters compiled into the host.
#[derive(Default)]
pub struct StaticLoader {
    entries: HashMap<String, EntryPoint>,
}

impl StaticLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `name`.
    pub fn with_entry(mut self, name: impl Into<String>, entry: EntryPoint) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticLoader")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, record: &PluginRecord) -> Result<LoadedModule> {
        self.entries
            .get(record.entry_point())
            .copied()
            .map(LoadedModule::from_entry)
            .ok_or_else(|| Error::MissingEntryPoint(record.entry_point().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;

    use super::*;
    use crate::discovery::Architecture;

    unsafe extern "system" fn noop(_: i16, _: *mut c_void, _: *mut isize, result: *mut i16) {
        // SAFETY: The engine passes a valid result pointer.
        unsafe { *result = 0 };
    }

    fn record(entry: &str) -> PluginRecord {
        PluginRecord::new("/nonexistent/module.8bf", entry, "Cat", "Title", Architecture::current())
    }

    #[test]
    fn test_static_lookup() {
        let loader = StaticLoader::new().with_entry("Main", noop);
        assert!(loader.load(&record("Main")).is_ok());
        assert!(matches!(
            loader.load(&record("Other")),
            Err(Error::MissingEntryPoint(name)) if name == "Other"
        ));
    }

    #[test]
    fn test_native_missing_file() {
        assert!(matches!(NativeLoader.load(&record("Main")), Err(Error::PluginLoad(_))));
    }
}
