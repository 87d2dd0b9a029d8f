//! Assayer extension registry.
//!
//! Checks may depend on configuration objects supplied by the build of the
//! archives under validation. Those objects live in small extension units:
//! Rust source files compiled on demand into dynamic libraries, cached in an
//! output directory and loaded once per run.
//!
//! # Modules
//!
//! - [`capability`] - Capability contracts, the registrar and the binding map
//! - [`cache`] - Output directory preparation, clearing and locking
//! - [`compiler`] - Compiler collaborator turning sources into units
//! - [`error`] - Semantic error types
//! - [`freshness`] - Modification-time staleness detection
//! - [`loader`] - Unit loaders and the registration entry point
//! - [`registry`] - The memoizing registry tying the steps together
//! - [`scanner`] - Discovery of compiled units

pub mod cache;
pub mod capability;
pub mod compiler;
pub mod error;
pub mod freshness;
pub mod loader;
pub mod registry;
pub mod scanner;

pub use capability::{BUILTIN_UNIT, Bindings, Capability, NoConfig, Registrar};
#[cfg(any(test, feature = "test-support"))]
pub use compiler::StubCompiler;
pub use compiler::{Compiler, RustcCompiler};
pub use error::{ExtensionError, Result};
pub use freshness::Staleness;
pub use loader::{DylibLoader, ENTRY_POINT, RegisterFn, StaticLoader, UnitLoader};
pub use registry::{DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_DIR, ExtensionRegistry, RegistryDirs};
pub use scanner::CompiledUnit;
