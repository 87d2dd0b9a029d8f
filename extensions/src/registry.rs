//! The memoizing extension registry.
//!
//! Discovery runs on the first resolution and its bindings are reused for the
//! rest of the registry's life:
//!
//! 1. A missing source directory yields only the [`NoConfig`](crate::NoConfig) binding.
//! 2. Otherwise the output directory is prepared and locked, and compared
//!    with the sources (see [`crate::freshness`]).
//! 3. Stale output is cleared and recompiled.
//! 4. Compiled units are enumerated in name order and loaded; each capability
//!    is bound to the first unit offering it.

use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;

use crate::cache::{self, CacheLock};
use crate::capability::{Bindings, Capability, Registrar};
use crate::compiler::{Compiler, RustcCompiler};
use crate::error::{ExtensionError, Result};
use crate::freshness::staleness;
use crate::loader::{DylibLoader, UnitLoader};
use crate::scanner::scan_units;

/// Default extension source directory.
pub const DEFAULT_SOURCE_DIR: &str = "/mnt/config/src";

/// Default compiled-output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "/mnt/config/bin";

/// Directories the registry works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDirs {
    /// Directory holding extension sources.
    pub source_dir: Utf8PathBuf,
    /// Derived cache of compiled units.
    pub output_dir: Utf8PathBuf,
}

impl RegistryDirs {
    /// Create a directory pair.
    #[must_use]
    pub fn new(source_dir: impl Into<Utf8PathBuf>, output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl Default for RegistryDirs {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DIR, DEFAULT_OUTPUT_DIR)
    }
}

/// Registry turning a directory of extension sources into capability
/// bindings.
///
/// # Examples
///
/// ```
/// use assayer_extensions::{ExtensionRegistry, NoConfig, RegistryDirs};
///
/// let registry = ExtensionRegistry::new(RegistryDirs::new(
///     "/nonexistent/assayer/src",
///     "/nonexistent/assayer/bin",
/// ));
/// let no_config = registry.resolve::<NoConfig>().expect("discovery succeeds");
/// assert!(no_config.is_some());
/// ```
pub struct ExtensionRegistry {
    dirs: RegistryDirs,
    compiler: Box<dyn Compiler>,
    bindings: OnceCell<Arc<Bindings>>,
    loader: Mutex<Box<dyn UnitLoader>>,
}

impl ExtensionRegistry {
    /// Create a registry compiling with `rustc` and loading dynamic libraries.
    #[must_use]
    pub fn new(dirs: RegistryDirs) -> Self {
        Self::with_parts(dirs, Box::new(RustcCompiler::default()), Box::new(DylibLoader::new()))
    }

    /// Create a registry from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        dirs: RegistryDirs,
        compiler: Box<dyn Compiler>,
        loader: Box<dyn UnitLoader>,
    ) -> Self {
        Self {
            dirs,
            compiler,
            bindings: OnceCell::new(),
            loader: Mutex::new(loader),
        }
    }

    /// Directories this registry works with.
    #[must_use]
    pub fn dirs(&self) -> &RegistryDirs {
        &self.dirs
    }

    /// Return the bindings, running discovery on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the extensions cannot be compiled or loaded. A
    /// failed discovery is retried on the next call.
    pub fn bindings(&self) -> Result<Arc<Bindings>> {
        self.bindings
            .get_or_try_init(|| self.discover().map(Arc::new))
            .cloned()
    }

    /// Resolve the instance bound to capability `C`.
    ///
    /// [`NoConfig`](crate::NoConfig) always resolves. Other capabilities resolve to `None`
    /// when no unit offers them.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub fn resolve<C: Capability + ?Sized>(&self) -> Result<Option<Arc<C>>> {
        Ok(self.bindings()?.get::<C>())
    }

    fn discover(&self) -> Result<Bindings> {
        let RegistryDirs {
            source_dir,
            output_dir,
        } = &self.dirs;
        let mut bindings = Bindings::new();

        if !source_dir.is_dir() {
            debug!("extension source directory {source_dir} does not exist");
            return Ok(bindings);
        }

        cache::prepare(output_dir)?;
        let _lock = CacheLock::acquire(output_dir)?;
        self.rebuild_if_stale(source_dir, output_dir)?;
        let units = scan_units(output_dir).map_err(|source| ExtensionError::ScanFailed { source })?;

        debug!(
            "found {} extension units: {:?}",
            units.len(),
            units.iter().map(|unit| unit.name.as_str()).collect::<Vec<_>>()
        );

        let mut loader = self.loader.lock().unwrap_or_else(PoisonError::into_inner);
        for unit in &units {
            let mut registrar = Registrar::new(&unit.name, &mut bindings);
            loader.load(unit, &mut registrar)?;
        }

        debug!("bound capabilities: {:?}", bindings.capability_names());
        Ok(bindings)
    }

    fn rebuild_if_stale(&self, source_dir: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        let state = staleness(source_dir, output_dir)
            .map_err(|source| ExtensionError::ScanFailed { source })?;
        if !state.needs_rebuild() {
            debug!("compiled extensions in {output_dir} are up to date");
            return Ok(());
        }

        info!("rebuilding extensions from {source_dir} ({state:?})");
        cache::clear(output_dir)?;
        self.compiler.compile(source_dir, output_dir).inspect_err(|_| {
            // Units built before the failure would look fresh on the next run.
            if let Err(err) = cache::clear(output_dir) {
                warn!("failed to discard the partial build in {output_dir}: {err}");
            }
        })
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("dirs", &self.dirs)
            .field("bindings", &self.bindings.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
