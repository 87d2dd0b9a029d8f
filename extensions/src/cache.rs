//! Compiled-output directory management.
//!
//! The output directory is a derived cache that can always be rebuilt from the
//! source directory, and it is the only directory the registry deletes or
//! recreates. Rebuilds are serialized across processes by an advisory lock on
//! [`LOCK_FILE_NAME`] inside the directory.

use std::fs::{self, File};
use std::io;

use camino::Utf8Path;
use fs2::FileExt;
use log::debug;

use crate::error::{ExtensionError, Result};

/// Name of the lock file kept inside the output directory.
pub const LOCK_FILE_NAME: &str = ".assayer.lock";

/// Ensure `output_dir` exists as a directory.
///
/// A regular file or symbolic link occupying the path is removed first.
///
/// # Errors
///
/// Returns [`ExtensionError::CacheFailed`] if the directory cannot be created.
pub fn prepare(output_dir: &Utf8Path) -> Result<()> {
    prepare_inner(output_dir).map_err(|source| cache_failed(output_dir, source))
}

fn prepare_inner(output_dir: &Utf8Path) -> io::Result<()> {
    match fs::symlink_metadata(output_dir) {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            debug!("removing non-directory at {output_dir}");
            fs::remove_file(output_dir)?;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    fs::create_dir_all(output_dir)
}

/// Remove everything in `output_dir` except the lock file.
///
/// # Errors
///
/// Returns [`ExtensionError::CacheFailed`] if an entry cannot be removed.
pub fn clear(output_dir: &Utf8Path) -> Result<()> {
    clear_inner(output_dir).map_err(|source| cache_failed(output_dir, source))
}

fn clear_inner(output_dir: &Utf8Path) -> io::Result<()> {
    for entry in output_dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_name() == LOCK_FILE_NAME {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    debug!("cleared {output_dir}");
    Ok(())
}

/// Exclusive advisory lock on an output directory.
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
}

impl CacheLock {
    /// Block until the exclusive lock on `output_dir` is held.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::CacheFailed`] if the lock file cannot be
    /// opened or locked.
    pub fn acquire(output_dir: &Utf8Path) -> Result<Self> {
        let path = output_dir.join(LOCK_FILE_NAME);
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| cache_failed(output_dir, source))?;
        FileExt::lock_exclusive(&file).map_err(|source| cache_failed(output_dir, source))?;
        debug!("locked {path}");
        Ok(Self { file })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        // Closing the file releases the lock as well.
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("failed to unlock output directory: {err}");
        }
    }
}

fn cache_failed(path: &Utf8Path, source: io::Error) -> ExtensionError {
    ExtensionError::CacheFailed {
        path: path.to_owned(),
        source,
    }
}
