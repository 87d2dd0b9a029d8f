//! Modification-time staleness detection for the compiled-output directory.

use std::fs;
use std::io;
use std::time::SystemTime;

use camino::Utf8Path;
use log::debug;

use crate::cache::LOCK_FILE_NAME;

/// Relationship between the source tree and the compiled-output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The output is at least as recent as every source.
    Fresh,
    /// The output directory does not exist.
    Missing,
    /// The output directory holds no compiled files.
    Empty,
    /// A source is newer than everything in the output directory.
    Outdated {
        /// Most recent source modification.
        source: SystemTime,
        /// Most recent output modification.
        output: SystemTime,
    },
}

impl Staleness {
    /// Returns true when the output must be rebuilt.
    #[must_use]
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Compare the source and output trees.
///
/// # Errors
///
/// Returns an error if either tree cannot be walked.
pub fn staleness(source_dir: &Utf8Path, output_dir: &Utf8Path) -> io::Result<Staleness> {
    if !output_dir.is_dir() {
        return Ok(Staleness::Missing);
    }

    let Some(output) = latest_output_modification(output_dir)? else {
        return Ok(Staleness::Empty);
    };
    let source = last_modified_recursive(source_dir)?;
    debug!("latest source modification {source:?}, latest output modification {output:?}");

    if source > output {
        Ok(Staleness::Outdated { source, output })
    } else {
        Ok(Staleness::Fresh)
    }
}

/// Most recent modification time of `path` and everything below it.
///
/// Symbolic links contribute their target's time when the target is newer
/// than the link itself; dangling links contribute only their own time.
/// Symbolic links to directories are not descended.
///
/// # Errors
///
/// Returns an error if `path` or a directory below it cannot be read.
pub fn last_modified_recursive(path: &Utf8Path) -> io::Result<SystemTime> {
    let mut latest = entry_modified(path)?;

    if fs::symlink_metadata(path)?.is_dir() {
        for entry in path.read_dir_utf8()? {
            let entry = entry?;
            latest = latest.max(last_modified_recursive(entry.path())?);
        }
    }

    Ok(latest)
}

/// Most recent modification below `output_dir`, ignoring the directory
/// itself and the cache lock file. `None` when nothing else is present.
fn latest_output_modification(output_dir: &Utf8Path) -> io::Result<Option<SystemTime>> {
    let mut latest = None;

    for entry in output_dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_name() == LOCK_FILE_NAME {
            continue;
        }
        let modified = last_modified_recursive(entry.path())?;
        latest = Some(latest.map_or(modified, |current: SystemTime| current.max(modified)));
    }

    Ok(latest)
}

fn entry_modified(path: &Utf8Path) -> io::Result<SystemTime> {
    let metadata = fs::symlink_metadata(path)?;
    let own = metadata.modified()?;

    if !metadata.file_type().is_symlink() {
        return Ok(own);
    }

    match fs::metadata(path).and_then(|target| target.modified()) {
        Ok(target) => Ok(own.max(target)),
        Err(_) => Ok(own),
    }
}
