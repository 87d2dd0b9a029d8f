//! Error types for the extension registry.
//!
//! Every variant is fatal for the run: a configuration that cannot be built
//! aborts before any check executes. Variants carry the context needed to act
//! on the failure, such as the compiler diagnostics or the offending unit.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while building the extension bindings.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The compiler program could not be started.
    #[error("extension compiler `{program}` is unavailable: {reason}")]
    CompilerUnavailable {
        /// Program that failed to start.
        program: String,
        /// Description of the spawn failure.
        reason: String,
    },

    /// The compiler rejected an extension source.
    #[error("failed to compile extension source {source_file}:\n{diagnostics}")]
    CompilationFailed {
        /// Source file that failed to compile.
        source_file: Utf8PathBuf,
        /// Diagnostics printed by the compiler.
        diagnostics: String,
    },

    /// The compiler did not finish within its deadline.
    #[error("extension compiler timed out after {seconds} seconds compiling {source_file}")]
    CompilerTimedOut {
        /// Source file being compiled.
        source_file: Utf8PathBuf,
        /// Deadline that elapsed.
        seconds: u64,
    },

    /// A compiled unit could not be loaded or refused to register.
    #[error("failed to instantiate extension unit {unit}: {reason}")]
    Instantiation {
        /// Fully-qualified name of the unit.
        unit: String,
        /// Description of the failure.
        reason: String,
    },

    /// The compiled-output directory could not be prepared, locked or cleared.
    #[error("extension cache {path} is unusable")]
    CacheFailed {
        /// Path of the compiled-output directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The compiled-output directory could not be scanned for units.
    #[error("failed to scan compiled extension units")]
    ScanFailed {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ExtensionError`].
pub type Result<T> = std::result::Result<T, ExtensionError>;
