//! Payload entry extraction.
//!
//! Entries are read from an [`EntrySource`], their names normalized to
//! absolute paths that cannot escape the archive root, and symbolic link
//! targets read from the entry content. The returned list is ordered by path
//! so that diagnostics listing paths are reproducible.

use std::collections::BTreeMap;
use std::io::Read;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::{ArchiveError, Result};

/// Kind of a raw container entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link whose target is stored as entry content.
    Symlink,
    /// Any other entry type (device nodes, fifos, hard links).
    Other,
}

/// One entry as produced by a low-level container reader.
pub struct RawEntry<'a> {
    /// Name stored in the container, possibly relative or non-normalized.
    pub name: String,
    /// Size declared by the entry header.
    pub size: u64,
    /// Entry type.
    pub kind: EntryKind,
    /// Reader over the entry content.
    pub content: &'a mut dyn Read,
}

/// Low-level container reader yielding raw entries in stream order.
pub trait EntrySource {
    /// Call `visitor` once per entry, in stream order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the container or the visitor.
    fn visit_entries(
        &mut self,
        visitor: &mut dyn FnMut(RawEntry<'_>) -> Result<()>,
    ) -> Result<()>;
}

/// A payload file and, for symbolic links, its target.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveEntry {
    /// Normalized absolute path of the entry.
    pub path: Utf8PathBuf,
    /// Target of the symbolic link, if the entry is one.
    pub symlink_target: Option<Utf8PathBuf>,
}

impl ArchiveEntry {
    /// Returns true if the entry is a symbolic link.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }
}

/// Read every payload entry from `source`, ordered by normalized path.
///
/// When two entries normalize to the same path the later one wins.
///
/// # Errors
///
/// Returns [`ArchiveError::IncompleteRead`] when a symbolic link yields fewer
/// bytes than it declares, and propagates container errors unchanged.
pub fn read_payload(source: &mut dyn EntrySource) -> Result<Vec<ArchiveEntry>> {
    let mut entries = BTreeMap::new();

    source.visit_entries(&mut |entry| {
        let target = match entry.kind {
            EntryKind::Symlink => {
                Some(read_symlink_target(&entry.name, entry.size, entry.content)?)
            }
            EntryKind::File | EntryKind::Directory | EntryKind::Other => None,
        };
        entries.insert(normalize_entry_path(&entry.name), target);
        Ok(())
    })?;

    Ok(entries
        .into_iter()
        .map(|(path, symlink_target)| ArchiveEntry {
            path,
            symlink_target,
        })
        .collect())
}

/// Normalize a stored entry name to an absolute path under `/`.
///
/// `.` components are dropped and `..` components pop at most up to the
/// root, so no entry can name a path outside it.
///
/// # Examples
///
/// ```
/// use assayer_common::normalize_entry_path;
///
/// assert_eq!(normalize_entry_path("../../etc/passwd"), "/etc/passwd");
/// assert_eq!(normalize_entry_path("./usr/share/../lib/x"), "/usr/lib/x");
/// ```
#[must_use]
pub fn normalize_entry_path(name: &str) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::from("/");

    for component in Utf8Path::new(name).components() {
        match component {
            Utf8Component::Normal(part) => normalized.push(part),
            Utf8Component::ParentDir => {
                normalized.pop();
            }
            Utf8Component::CurDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {}
        }
    }

    normalized
}

fn read_symlink_target(entry: &str, size: u64, content: &mut dyn Read) -> Result<Utf8PathBuf> {
    let mut bytes = Vec::new();
    content.take(size).read_to_end(&mut bytes)?;

    let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if actual < size {
        return Err(ArchiveError::IncompleteRead {
            entry: entry.to_owned(),
            expected: size,
            actual,
        });
    }

    String::from_utf8(bytes)
        .map(Utf8PathBuf::from)
        .map_err(|_| ArchiveError::InvalidSymlinkTarget {
            entry: entry.to_owned(),
        })
}
