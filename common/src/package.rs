//! Read-only package metadata views.
//!
//! A [`PackageView`] captures the identity of one archive under validation
//! together with the capability strings it provides and requires. Views are
//! assembled once by a [`PackageSource`] and never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{ArchiveError, Result};

/// Supplies package views for archive paths.
pub trait PackageSource {
    /// Read the metadata of the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be opened or its metadata is
    /// malformed.
    fn open(&self, path: &Utf8Path) -> Result<PackageView>;
}

/// Immutable view of one archive's identity and declared relations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageView {
    path: Utf8PathBuf,
    name: String,
    architecture: String,
    is_source: bool,
    source_package: String,
    provides: BTreeSet<String>,
    requires: BTreeSet<String>,
}

impl PackageView {
    /// Create a view of a source archive.
    ///
    /// A source archive is its own source package.
    #[must_use]
    pub fn source(
        path: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            source_package: name.clone(),
            name,
            architecture: architecture.into(),
            is_source: true,
            provides: BTreeSet::new(),
            requires: BTreeSet::new(),
        }
    }

    /// Create a view of a binary archive built from `source_archive`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::SourcePackageName`] when the package name
    /// cannot be derived from `source_archive`.
    pub fn binary(
        path: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
        architecture: impl Into<String>,
        source_archive: &str,
    ) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            name: name.into(),
            architecture: architecture.into(),
            is_source: false,
            source_package: package_name_from_source_archive(source_archive)?,
            provides: BTreeSet::new(),
            requires: BTreeSet::new(),
        })
    }

    /// Attach the capability strings this archive provides.
    #[must_use]
    pub fn with_provides<I, S>(mut self, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(provides.into_iter().map(Into::into));
        self
    }

    /// Attach the capability strings this archive requires.
    #[must_use]
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(requires.into_iter().map(Into::into));
        self
    }

    /// Path of the archive file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Package name recorded in the archive metadata.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Architecture recorded in the archive metadata.
    #[must_use]
    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Whether the archive is a source archive.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        self.is_source
    }

    /// Name of the source package the archive belongs to.
    #[must_use]
    pub fn source_package(&self) -> &str {
        &self.source_package
    }

    /// Capability strings provided by the archive.
    #[must_use]
    pub const fn provides(&self) -> &BTreeSet<String> {
        &self.provides
    }

    /// Capability strings required by the archive.
    #[must_use]
    pub const fn requires(&self) -> &BTreeSet<String> {
        &self.requires
    }
}

impl fmt::Display for PackageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.architecture)
    }
}

/// Derive a package name from a source archive file name.
///
/// The trailing release and version segments are stripped, so
/// `foo-bar-1.0-3.src.tar.zst` yields `foo-bar`.
///
/// # Errors
///
/// Returns [`ArchiveError::SourcePackageName`] when the file name has fewer
/// than two `-` separators or the remaining name is empty.
///
/// # Examples
///
/// ```
/// use assayer_common::package_name_from_source_archive;
///
/// let name = package_name_from_source_archive("foo-1.0-1.src.tar.zst");
/// assert_eq!(name.ok().as_deref(), Some("foo"));
/// ```
pub fn package_name_from_source_archive(file_name: &str) -> Result<String> {
    file_name
        .rsplit_once('-')
        .and_then(|(without_release, _)| without_release.rsplit_once('-'))
        .map(|(name, _)| name)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ArchiveError::SourcePackageName {
            file_name: file_name.to_owned(),
        })
}
