//! Discovery of extension sources and compiled units.
//!
//! The output directory mirrors the source directory: the source
//! `{source_dir}/policies/strict.rs` compiles to
//! `{output_dir}/policies/{prefix}strict{extension}` and is known as the unit
//! `policies::strict`.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};

/// Extension of extension source files, without the dot.
pub const SOURCE_EXTENSION: &str = "rs";

/// A compiled unit found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompiledUnit {
    /// Fully-qualified unit name, e.g. `policies::strict`.
    pub name: String,
    /// Full path to the library file.
    pub path: Utf8PathBuf,
}

/// Return the platform-specific library file extension (including the dot).
#[must_use]
pub const fn library_extension() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        ".dylib"
    }
    #[cfg(target_os = "windows")]
    {
        ".dll"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ".so"
    }
}

/// Return the platform-specific library filename prefix.
#[must_use]
pub const fn library_prefix() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ""
    }
    #[cfg(not(target_os = "windows"))]
    {
        "lib"
    }
}

/// Collect every extension source below `source_dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn scan_sources(source_dir: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut sources = Vec::new();
    walk_files(source_dir, &mut |path| {
        if path.extension() == Some(SOURCE_EXTENSION) {
            sources.push(path.to_owned());
        }
    })?;
    sources.sort();
    Ok(sources)
}

/// Collect every compiled unit below `output_dir`, sorted by unit name.
///
/// Files that do not carry the platform library prefix and extension, such as
/// the cache lock file, are ignored.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn scan_units(output_dir: &Utf8Path) -> io::Result<Vec<CompiledUnit>> {
    let mut units = Vec::new();
    walk_files(output_dir, &mut |path| {
        if let Some(name) = unit_name(output_dir, path) {
            units.push(CompiledUnit {
                name,
                path: path.to_owned(),
            });
        }
    })?;
    units.sort();
    Ok(units)
}

/// Path of the unit compiled from `source`.
///
/// Returns `None` when `source` is not below `source_dir` or has no file stem.
///
/// # Examples
///
/// ```
/// use assayer_extensions::scanner::{library_extension, library_prefix, unit_path_for};
/// use camino::Utf8Path;
///
/// let unit = unit_path_for(
///     Utf8Path::new("/src"),
///     Utf8Path::new("/bin"),
///     Utf8Path::new("/src/policies/strict.rs"),
/// );
/// let expected = format!("/bin/policies/{}strict{}", library_prefix(), library_extension());
/// assert_eq!(unit.as_deref().map(|p| p.as_str()), Some(expected.as_str()));
/// ```
#[must_use]
pub fn unit_path_for(
    source_dir: &Utf8Path,
    output_dir: &Utf8Path,
    source: &Utf8Path,
) -> Option<Utf8PathBuf> {
    let relative = source.strip_prefix(source_dir).ok()?;
    let stem = relative.file_stem()?;
    let file_name = format!("{}{stem}{}", library_prefix(), library_extension());
    let parent = relative.parent().unwrap_or(Utf8Path::new(""));
    Some(output_dir.join(parent).join(file_name))
}

/// Derive the fully-qualified unit name of a library below `output_dir`.
///
/// # Examples
///
/// ```
/// use assayer_extensions::scanner::{library_extension, library_prefix, unit_name};
/// use camino::Utf8Path;
///
/// let file = format!("/bin/policies/{}strict{}", library_prefix(), library_extension());
/// let name = unit_name(Utf8Path::new("/bin"), Utf8Path::new(&file));
/// assert_eq!(name.as_deref(), Some("policies::strict"));
/// ```
#[must_use]
pub fn unit_name(output_dir: &Utf8Path, library: &Utf8Path) -> Option<String> {
    let relative = library.strip_prefix(output_dir).ok()?;
    let stem = relative
        .file_name()?
        .strip_prefix(library_prefix())?
        .strip_suffix(library_extension())?;
    if stem.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = relative
        .parent()
        .map(|parent| parent.iter().collect())
        .unwrap_or_default();
    segments.push(stem);
    Some(segments.join("::"))
}

fn walk_files(dir: &Utf8Path, visit: &mut dyn FnMut(&Utf8Path)) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_files(path, visit)?;
        } else if path.is_file() {
            visit(path);
        }
    }

    Ok(())
}
