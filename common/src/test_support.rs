//! Fixture builders for tests that need real archives on disk.
//!
//! [`ArchiveFixture`] writes a tar archive, compressed according to the file
//! name suffix, with a metadata member and an arbitrary payload.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::archive::{Compression, METADATA_MEMBER};

#[derive(Debug, Serialize)]
struct MetadataDocument {
    name: String,
    arch: String,
    source: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_archive: Option<String>,
    provides: Vec<String>,
    requires: Vec<String>,
}

#[derive(Debug)]
enum Member {
    File { name: String, content: Vec<u8> },
    Directory { name: String },
    Symlink { name: String, target: String },
}

/// Builder for archives used as test inputs.
///
/// # Examples
///
/// ```
/// use assayer_common::read_package_view;
/// use assayer_common::test_support::ArchiveFixture;
/// use camino::Utf8Path;
///
/// # fn demo() -> std::io::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let root = Utf8Path::from_path(dir.path()).ok_or_else(|| std::io::Error::other("utf-8"))?;
/// let path = ArchiveFixture::binary("foo-javadoc", "noarch", "foo-1.0-1.src.tar")
///     .file("usr/share/javadoc/foo/index.html", "<html/>")
///     .write(root, "foo-javadoc-1.0-1.noarch.tar.zst")?;
/// let view = read_package_view(&path).map_err(std::io::Error::other)?;
/// assert_eq!(view.source_package(), "foo");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveFixture {
    metadata: MetadataDocument,
    members: Vec<Member>,
}

impl ArchiveFixture {
    /// Start a binary archive built from `source_archive`.
    #[must_use]
    pub fn binary(name: &str, arch: &str, source_archive: &str) -> Self {
        Self::new(name, arch, false, Some(source_archive.to_owned()))
    }

    /// Start a source archive.
    #[must_use]
    pub fn source(name: &str, arch: &str) -> Self {
        Self::new(name, arch, true, None)
    }

    fn new(name: &str, arch: &str, source: bool, source_archive: Option<String>) -> Self {
        Self {
            metadata: MetadataDocument {
                name: name.to_owned(),
                arch: arch.to_owned(),
                source,
                source_archive,
                provides: Vec::new(),
                requires: Vec::new(),
            },
            members: Vec::new(),
        }
    }

    /// Declare provided capability strings.
    #[must_use]
    pub fn provides(mut self, provides: &[&str]) -> Self {
        self.metadata
            .provides
            .extend(provides.iter().map(|&p| p.to_owned()));
        self
    }

    /// Declare required capability strings.
    #[must_use]
    pub fn requires(mut self, requires: &[&str]) -> Self {
        self.metadata
            .requires
            .extend(requires.iter().map(|&r| r.to_owned()));
        self
    }

    /// Add a regular file to the payload.
    #[must_use]
    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.members.push(Member::File {
            name: name.to_owned(),
            content: content.as_ref().to_vec(),
        });
        self
    }

    /// Add a directory to the payload.
    #[must_use]
    pub fn directory(mut self, name: &str) -> Self {
        self.members.push(Member::Directory {
            name: name.to_owned(),
        });
        self
    }

    /// Add a symbolic link to the payload.
    #[must_use]
    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.members.push(Member::Symlink {
            name: name.to_owned(),
            target: target.to_owned(),
        });
        self
    }

    /// Write the archive as `dir/file_name` and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file name has no supported archive suffix or
    /// the archive cannot be written.
    pub fn write(&self, dir: &Utf8Path, file_name: &str) -> io::Result<Utf8PathBuf> {
        let path = dir.join(file_name);
        let compression = Compression::detect(&path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unsupported suffix: {file_name}"))
        })?;

        let tar_bytes = self.tar_bytes()?;
        let encoded = match compression {
            Compression::None => tar_bytes,
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&tar_bytes)?;
                encoder.finish()?
            }
            Compression::Zstd => zstd::encode_all(tar_bytes.as_slice(), 0)?,
        };

        fs::write(&path, encoded)?;
        Ok(path)
    }

    fn tar_bytes(&self) -> io::Result<Vec<u8>> {
        let metadata = toml::to_string(&self.metadata).map_err(io::Error::other)?;
        let mut builder = tar::Builder::new(Vec::new());

        append_file(&mut builder, METADATA_MEMBER, metadata.as_bytes())?;
        for member in &self.members {
            match member {
                Member::File { name, content } => append_file(&mut builder, name, content)?,
                Member::Directory { name } => {
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder.append_data(&mut header, name, io::empty())?;
                }
                Member::Symlink { name, target } => {
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_mode(0o777);
                    header.set_size(0);
                    builder.append_link(&mut header, name, target)?;
                }
            }
        }

        builder.into_inner()
    }
}

fn append_file(builder: &mut tar::Builder<Vec<u8>>, name: &str, content: &[u8]) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(u64::try_from(content.len()).unwrap_or(u64::MAX));
    builder.append_data(&mut header, name, content)
}
