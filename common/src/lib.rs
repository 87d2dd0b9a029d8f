//! Shared archive primitives for Assayer checks: package metadata views,
//! payload entry extraction, dependency closure and the tar-based archive
//! collaborator.

pub mod archive;
pub mod closure;
pub mod error;
pub mod inputs;
pub mod package;
pub mod payload;
pub mod test_support;

pub use archive::{
    Compression, METADATA_MEMBER, TarEntrySource, TarPackageSource, is_archive_path,
    read_package_view,
};
pub use closure::dependency_closure;
pub use error::{ArchiveError, Result};
pub use inputs::expand_inputs;
pub use package::{PackageSource, PackageView, package_name_from_source_archive};
pub use payload::{
    ArchiveEntry, EntryKind, EntrySource, RawEntry, normalize_entry_path, read_payload,
};
