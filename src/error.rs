//! Error types for running checks.
//!
//! Rule violations are never errors; they are messages in a
//! [`crate::CheckResult`]. Everything here aborts the run with exit code 2.

use camino::Utf8PathBuf;
use thiserror::Error;

use assayer_common::ArchiveError;
use assayer_extensions::ExtensionError;

/// Errors that abort a check run.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path}")]
    SettingsRead {
        /// Path named by the settings environment variable.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid.
    #[error("invalid settings in {path}: {reason}")]
    InvalidSettings {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Extension configuration could not be built.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// An archive could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A check failed for a reason other than an archive or extension error.
    #[error("check {check} failed: {reason}")]
    CheckFailed {
        /// Name of the check.
        check: String,
        /// Description of the failure.
        reason: String,
    },
}

/// Result type alias using [`CheckError`].
pub type Result<T> = std::result::Result<T, CheckError>;
