//! Expansion of command-line inputs into archive paths.

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use log::debug;

use crate::archive::is_archive_path;
use crate::error::{ArchiveError, Result};

/// Expand archive files and directories into a list of archive paths.
///
/// Files are kept as given, in argument order. A directory expands to every
/// archive file below it, sorted by path. Entries that are neither are passed
/// through unchanged so that opening them reports a precise error.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidInput`] if a directory cannot be walked.
pub fn expand_inputs(inputs: &[Utf8PathBuf]) -> Result<Vec<Utf8PathBuf>> {
    let mut expanded = Vec::with_capacity(inputs.len());

    for input in inputs {
        if input.is_dir() {
            let mut found = archives_below(input)?;
            debug!("expanded {input} into {} archives", found.len());
            expanded.append(&mut found);
        } else {
            expanded.push(input.clone());
        }
    }

    Ok(expanded)
}

fn archives_below(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let pattern = format!("{}/**/*", Pattern::escape(dir.as_str()));
    let paths = glob::glob(&pattern).map_err(|err| ArchiveError::InvalidInput {
        pattern: pattern.clone(),
        reason: err.to_string(),
    })?;

    let mut archives = Vec::new();
    for path in paths {
        let path = path.map_err(|err| ArchiveError::InvalidInput {
            pattern: pattern.clone(),
            reason: err.to_string(),
        })?;
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        if path.is_file() && is_archive_path(&path) {
            archives.push(path);
        }
    }

    archives.sort();
    Ok(archives)
}
