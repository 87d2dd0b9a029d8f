//! Check requiring javadoc packages to be architecture-independent.
//!
//! A binary archive named `<source>-javadoc`, or `<source>-javadocs`, only
//! carries generated documentation and must be built for `noarch`. Source
//! archives and other binary archives are not inspected.

use assayer::{ElementRule, Elementwise, Result, RunContext, fail_message};
use assayer_common::PackageView;
use assayer_extensions::NoConfig;
use log::debug;

/// Name of the check and target of its log records.
pub const CHECK_NAME: &str = "javadoc_noarch";

/// The architecture javadoc packages must have.
pub const NOARCH: &str = "noarch";

/// Rule flagging javadoc packages with a concrete architecture.
#[derive(Clone, Copy, Debug, Default)]
pub struct JavadocNoarch;

impl ElementRule for JavadocNoarch {
    type Config = NoConfig;

    fn name(&self) -> &str {
        CHECK_NAME
    }

    fn check_one(
        &self,
        _config: &NoConfig,
        _ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>> {
        if package.architecture() == NOARCH {
            debug!(
                target: CHECK_NAME,
                "{} is a javadoc package and its architecture is {NOARCH}",
                package.path()
            );
            return Ok(Vec::new());
        }

        Ok(vec![fail_message(format_args!(
            "{} is a javadoc package but its architecture is {}",
            package.path(),
            package.architecture()
        ))])
    }
}

/// Returns true for binary archives named after their source package with a
/// `-javadoc` or `-javadocs` suffix.
///
/// # Examples
///
/// ```
/// use assayer_common::PackageView;
/// use javadoc_noarch::is_javadoc_package;
///
/// let docs = PackageView::binary("d.tar", "foo-javadoc", "noarch", "foo-1.0-1.src.tar")?;
/// let api = PackageView::binary("a.tar", "foo-javadoc-api", "noarch", "foo-1.0-1.src.tar")?;
/// assert!(is_javadoc_package(&docs));
/// assert!(!is_javadoc_package(&api));
/// # Ok::<(), assayer_common::ArchiveError>(())
/// ```
#[must_use]
pub fn is_javadoc_package(package: &PackageView) -> bool {
    if package.is_source() {
        return false;
    }

    let name = package.name();
    let stem = name
        .strip_suffix("-javadocs")
        .or_else(|| name.strip_suffix("-javadoc"));
    stem == Some(package.source_package())
}

/// The check, limited to javadoc packages.
#[must_use]
pub fn check() -> Elementwise<JavadocNoarch> {
    Elementwise::new(JavadocNoarch).with_filter(is_javadoc_package)
}
