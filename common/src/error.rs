//! Error types for archive metadata and payload access.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while reading archive metadata or payload entries.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The package name could not be derived from a source archive file name.
    #[error("could not read package name for source archive {file_name}")]
    SourcePackageName {
        /// The source archive file name that failed to parse.
        file_name: String,
    },

    /// The archive carries no metadata member.
    #[error("archive {path} has no {member} member")]
    MissingMetadata {
        /// Path of the archive.
        path: Utf8PathBuf,
        /// Name of the expected metadata member.
        member: &'static str,
    },

    /// The metadata member could not be parsed.
    #[error("invalid metadata in {path}: {reason}")]
    InvalidMetadata {
        /// Path of the archive.
        path: Utf8PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The file name does not match a supported container format.
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: Utf8PathBuf,
    },

    /// A symbolic link entry yielded fewer content bytes than it declared.
    ///
    /// The archive stream is corrupt or truncated.
    #[error("incomplete read in archive stream: {entry} declares {expected} bytes, got {actual}")]
    IncompleteRead {
        /// Raw name of the truncated entry.
        entry: String,
        /// Size declared by the entry header.
        expected: u64,
        /// Number of bytes actually available.
        actual: u64,
    },

    /// A symbolic link target is not valid UTF-8.
    #[error("symlink target of {entry} is not valid UTF-8")]
    InvalidSymlinkTarget {
        /// Raw name of the offending entry.
        entry: String,
    },

    /// An input directory could not be expanded.
    #[error("invalid input pattern {pattern}: {reason}")]
    InvalidInput {
        /// The pattern that failed.
        pattern: String,
        /// Description of the failure.
        reason: String,
    },

    /// An I/O operation on an archive failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ArchiveError`].
pub type Result<T> = std::result::Result<T, ArchiveError>;
