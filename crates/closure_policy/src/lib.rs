//! Check applying a configured policy to dependency closures.
//!
//! For every binary archive of a run, the archives reachable through its
//! requirements are computed with [`dependency_closure`] over the archives of
//! the run. Each of them must be allowed by the [`ClosurePolicy`] an extension
//! binds. Without such an extension the check is skipped.
//!
//! An extension unit enabling the check:
//!
//! ```ignore
//! use assayer_common::PackageView;
//! use assayer_extensions::export_extension;
//! use closure_policy::ClosurePolicy;
//!
//! struct SameArchitecture;
//!
//! impl ClosurePolicy for SameArchitecture {
//!     fn allowed(&self, package: &PackageView, dependency: &PackageView) -> bool {
//!         dependency.architecture() == "noarch"
//!             || dependency.architecture() == package.architecture()
//!     }
//! }
//!
//! export_extension!(SameArchitecture => dyn ClosurePolicy);
//! ```

use assayer::{ElementRule, Elementwise, Result, RunContext, fail_message};
use assayer_common::{PackageView, dependency_closure};
use assayer_extensions::Capability;
use log::debug;

/// Name of the check and target of its log records.
pub const CHECK_NAME: &str = "closure_policy";

/// Decides which dependencies an archive may pull in.
pub trait ClosurePolicy: Send + Sync {
    /// Returns true if `package` may depend on `dependency`.
    fn allowed(&self, package: &PackageView, dependency: &PackageView) -> bool;
}

impl Capability for dyn ClosurePolicy {
    const NAME: &'static str = "ClosurePolicy";
}

/// Rule reporting every disallowed member of an archive's closure.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClosureRule;

impl ElementRule for ClosureRule {
    type Config = dyn ClosurePolicy;

    fn name(&self) -> &str {
        CHECK_NAME
    }

    fn check_one(
        &self,
        policy: &dyn ClosurePolicy,
        ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>> {
        let closure = dependency_closure(package, ctx.universe());
        debug!(
            target: CHECK_NAME,
            "closure of {}: [{}]",
            package.path(),
            closure
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(closure
            .into_iter()
            .filter(|dependency| !policy.allowed(package, dependency))
            .map(|dependency| {
                fail_message(format_args!(
                    "{} depends on {}, which the closure policy does not allow",
                    package.path(),
                    dependency.path()
                ))
            })
            .collect())
    }
}

/// The check, limited to binary archives.
#[must_use]
pub fn check() -> Elementwise<ClosureRule> {
    Elementwise::new(ClosureRule).with_filter(|package| !package.is_source())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assayer_extensions::{Bindings, Registrar, RegistryDirs};
    use std::sync::Arc;

    /// Forbids dependencies on a named package.
    struct Forbid(&'static str);

    impl ClosurePolicy for Forbid {
        fn allowed(&self, _package: &PackageView, dependency: &PackageView) -> bool {
            dependency.name() != self.0
        }
    }

    fn binary(name: &str) -> PackageView {
        PackageView::binary(format!("/srv/{name}.tar"), name, "x86_64", "src-1.0-1.src.tar")
            .expect("source archive name is valid")
    }

    fn context(universe: Vec<PackageView>) -> RunContext {
        let mut bindings = Bindings::new();
        Registrar::new("forbid", &mut bindings).offer::<dyn ClosurePolicy>(Arc::new(Forbid("c")));
        RunContext::new(Arc::new(bindings), RegistryDirs::default(), universe)
    }

    #[test]
    fn disallowed_transitive_dependency_is_reported() {
        let a = binary("a").with_requires(["libx.so"]);
        let b = binary("b").with_provides(["libx.so"]).with_requires(["liby.so"]);
        let c = binary("c").with_provides(["liby.so"]);
        let ctx = context(vec![a.clone(), b, c]);

        let messages = ClosureRule
            .check_one(&Forbid("c"), &ctx, &a)
            .expect("closure check succeeds");

        assert_eq!(
            messages,
            ["[FAIL] /srv/a.tar depends on /srv/c.tar, which the closure policy does not allow"]
        );
    }

    #[test]
    fn empty_closure_passes() {
        let lonely = binary("lonely").with_requires(["libmissing.so"]);
        let ctx = context(vec![lonely.clone()]);

        let messages = ClosureRule
            .check_one(&Forbid("c"), &ctx, &lonely)
            .expect("closure check succeeds");

        assert!(messages.is_empty());
    }

    #[test]
    fn source_archives_are_filtered_out() {
        let check = check();

        assert!(!check.accepts(&PackageView::source("/srv/a.src.tar", "a", "src")));
        assert!(check.accepts(&binary("a")));
    }
}
