//! Suite check registry and shared metadata.

use assayer::DynCheck;

/// Minimal metadata describing an included check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CheckDescriptor {
    /// Name the check reports in logs and skip notices.
    pub name: &'static str,
    /// Crate that defines the check.
    pub crate_name: &'static str,
}

/// Static list of the checks run by the suite, in run order.
pub const SUITE_CHECKS: &[CheckDescriptor] = &[
    CheckDescriptor {
        name: javadoc_noarch::CHECK_NAME,
        crate_name: "javadoc_noarch",
    },
    CheckDescriptor {
        name: closure_policy::CHECK_NAME,
        crate_name: "closure_policy",
    },
];

/// Names of the checks run by the suite, in run order.
pub fn suite_check_names() -> impl Iterator<Item = &'static str> {
    SUITE_CHECKS.iter().map(|check| check.name)
}

/// Fresh instances of every suite check, in run order.
///
/// Checks are consumed by a run, so each run needs its own set.
#[must_use]
pub fn suite_checks() -> Vec<Box<dyn DynCheck>> {
    vec![
        Box::new(javadoc_noarch::check()),
        Box::new(closure_policy::check()),
    ]
}
