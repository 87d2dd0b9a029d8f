//! Extension unit enabling the `closure_policy` check.
//!
//! Binary archives may depend on architecture-independent archives and on
//! archives built for their own architecture.

use assayer_common::PackageView;
use assayer_extensions::export_extension;
use closure_policy::ClosurePolicy;

/// Policy keeping dependency closures within one architecture.
pub struct NoarchDependencies;

impl ClosurePolicy for NoarchDependencies {
    fn allowed(&self, package: &PackageView, dependency: &PackageView) -> bool {
        dependency.architecture() == "noarch"
            || dependency.architecture() == package.architecture()
    }
}

export_extension!(NoarchDependencies => dyn ClosurePolicy);
