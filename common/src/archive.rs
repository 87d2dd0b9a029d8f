//! Tar-based archive collaborator.
//!
//! Archives are tar streams, optionally compressed with gzip or zstd. The
//! package metadata lives in a TOML member named [`METADATA_MEMBER`]; every
//! other member is payload.
//!
//! ```toml
//! name = "foo-javadoc"
//! arch = "noarch"
//! source_archive = "foo-1.0-1.src.tar.zst"
//! provides = ["foo-javadoc"]
//! requires = ["javapackages-filesystem"]
//! ```

use std::fs::File;
use std::io::{BufReader, Cursor, Read};

use camino::Utf8Path;
use flate2::read::GzDecoder;
use log::debug;
use serde::Deserialize;

use crate::error::{ArchiveError, Result};
use crate::package::{PackageSource, PackageView};
use crate::payload::{EntryKind, EntrySource, RawEntry};

/// Name of the metadata member inside every archive.
pub const METADATA_MEMBER: &str = ".PKGINFO";

/// Compression applied to the tar stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    /// Plain `.tar`.
    None,
    /// `.tar.gz` or `.tgz`.
    Gzip,
    /// `.tar.zst` or `.tzst`.
    Zstd,
}

impl Compression {
    /// Detect the compression from the archive file name.
    ///
    /// Returns `None` when the name has no recognised archive suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use assayer_common::Compression;
    /// use camino::Utf8Path;
    ///
    /// let detected = Compression::detect(Utf8Path::new("foo-1.0-1.noarch.tar.zst"));
    /// assert_eq!(detected, Some(Compression::Zstd));
    /// assert_eq!(Compression::detect(Utf8Path::new("README.md")), None);
    /// ```
    #[must_use]
    pub fn detect(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        if name.ends_with(".tar") {
            Some(Self::None)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Gzip)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Self::Zstd)
        } else {
            None
        }
    }
}

/// Open the decompressed tar stream of an archive.
fn open_stream(path: &Utf8Path) -> Result<Box<dyn Read>> {
    let compression = Compression::detect(path).ok_or_else(|| ArchiveError::UnsupportedFormat {
        path: path.to_owned(),
    })?;
    let file = File::open(path)?;

    let stream: Box<dyn Read> = match compression {
        Compression::None => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(GzDecoder::new(BufReader::new(file))),
        Compression::Zstd => Box::new(zstd::Decoder::new(file)?),
    };
    Ok(stream)
}

fn is_metadata_member(name: &str) -> bool {
    name.trim_start_matches("./") == METADATA_MEMBER
}

/// Payload reader over a tar archive on disk.
///
/// The metadata member is skipped. Symbolic link targets are taken from the
/// tar link name and presented as entry content.
pub struct TarEntrySource {
    archive: tar::Archive<Box<dyn Read>>,
}

impl TarEntrySource {
    /// Open the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name has no supported suffix or the file
    /// cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            archive: tar::Archive::new(open_stream(path)?),
        })
    }
}

impl EntrySource for TarEntrySource {
    fn visit_entries(
        &mut self,
        visitor: &mut dyn FnMut(RawEntry<'_>) -> Result<()>,
    ) -> Result<()> {
        for entry in self.archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            if is_metadata_member(&name) {
                continue;
            }

            let entry_type = entry.header().entry_type();
            if entry_type.is_symlink() {
                let target = entry
                    .link_name_bytes()
                    .map(|bytes| bytes.into_owned())
                    .unwrap_or_default();
                let size = u64::try_from(target.len()).unwrap_or(u64::MAX);
                let mut content = Cursor::new(target);
                visitor(RawEntry {
                    name,
                    size,
                    kind: EntryKind::Symlink,
                    content: &mut content,
                })?;
            } else {
                let kind = if entry_type.is_dir() {
                    EntryKind::Directory
                } else if entry_type.is_file() {
                    EntryKind::File
                } else {
                    EntryKind::Other
                };
                let size = entry.size();
                visitor(RawEntry {
                    name,
                    size,
                    kind,
                    content: &mut entry,
                })?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageMetadata {
    name: String,
    arch: String,
    #[serde(default)]
    source: bool,
    #[serde(default)]
    source_archive: Option<String>,
    #[serde(default)]
    provides: Vec<String>,
    #[serde(default)]
    requires: Vec<String>,
}

/// Read the package view of the archive at `path`.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingMetadata`] when the archive has no metadata
/// member, [`ArchiveError::InvalidMetadata`] when it does not parse, and I/O
/// errors from the underlying stream.
pub fn read_package_view(path: &Utf8Path) -> Result<PackageView> {
    let mut archive = tar::Archive::new(open_stream(path)?);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        if !is_metadata_member(&name) {
            continue;
        }

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|err| invalid_metadata(path, &err))?;
        let metadata: PackageMetadata =
            toml::from_str(&text).map_err(|err| invalid_metadata(path, &err))?;
        debug!("read metadata of {path}: {metadata:?}");
        return package_view_from(path, metadata);
    }

    Err(ArchiveError::MissingMetadata {
        path: path.to_owned(),
        member: METADATA_MEMBER,
    })
}

fn invalid_metadata(path: &Utf8Path, err: &dyn std::fmt::Display) -> ArchiveError {
    ArchiveError::InvalidMetadata {
        path: path.to_owned(),
        reason: err.to_string(),
    }
}

fn package_view_from(path: &Utf8Path, metadata: PackageMetadata) -> Result<PackageView> {
    let view = if metadata.source {
        PackageView::source(path, metadata.name, metadata.arch)
    } else {
        let source_archive = metadata
            .source_archive
            .ok_or_else(|| ArchiveError::InvalidMetadata {
                path: path.to_owned(),
                reason: "binary archive lacks `source_archive`".to_owned(),
            })?;
        PackageView::binary(path, metadata.name, metadata.arch, &source_archive)?
    };

    Ok(view
        .with_provides(metadata.provides)
        .with_requires(metadata.requires))
}

/// [`PackageSource`] reading the tar-based archive format.
#[derive(Clone, Copy, Debug, Default)]
pub struct TarPackageSource;

impl PackageSource for TarPackageSource {
    fn open(&self, path: &Utf8Path) -> Result<PackageView> {
        read_package_view(path)
    }
}

/// Returns true if `path` names a file with a supported archive suffix.
#[must_use]
pub fn is_archive_path(path: &Utf8Path) -> bool {
    Compression::detect(path).is_some()
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
