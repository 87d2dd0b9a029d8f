//! Read-only state shared by the checks of one run.

use std::sync::Arc;

use assayer_common::PackageView;
use assayer_extensions::{Bindings, Capability, RegistryDirs};

/// Default log target for check diagnostics.
pub const DEFAULT_LOG_TARGET: &str = "assayer";

/// Configuration bindings, directories, log target and the archives under
/// validation, fixed when the run starts.
///
/// A check that delegates to another check hands it a [`RunContext::child`];
/// the child sees the same state and nothing it does flows back.
#[derive(Clone, Debug)]
pub struct RunContext {
    bindings: Arc<Bindings>,
    dirs: RegistryDirs,
    universe: Arc<[PackageView]>,
    log_target: Arc<str>,
}

impl RunContext {
    /// Create a context for a run over `universe`.
    #[must_use]
    pub fn new(
        bindings: Arc<Bindings>,
        dirs: RegistryDirs,
        universe: impl Into<Arc<[PackageView]>>,
    ) -> Self {
        Self {
            bindings,
            dirs,
            universe: universe.into(),
            log_target: Arc::from(DEFAULT_LOG_TARGET),
        }
    }

    /// Context for a child check, inheriting everything from `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Child context whose log records use `target`.
    #[must_use]
    pub fn child_with_log_target(&self, target: &str) -> Self {
        Self {
            log_target: Arc::from(target),
            ..self.clone()
        }
    }

    /// Resolved configuration bindings.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Instance bound to capability `C`, if any.
    #[must_use]
    pub fn resolve<C: Capability + ?Sized>(&self) -> Option<Arc<C>> {
        self.bindings.get::<C>()
    }

    /// Extension directories of the run.
    #[must_use]
    pub fn dirs(&self) -> &RegistryDirs {
        &self.dirs
    }

    /// Every archive given to the run, in input order.
    #[must_use]
    pub fn universe(&self) -> &[PackageView] {
        &self.universe
    }

    /// Target for log records emitted on behalf of checks.
    #[must_use]
    pub fn log_target(&self) -> &str {
        &self.log_target
    }
}
