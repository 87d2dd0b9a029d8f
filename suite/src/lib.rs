//! Aggregated Assayer check suite.
//!
//! This crate bundles the individual check crates into the single `assayer`
//! binary. One run resolves the extension configuration once and hands the
//! same bindings to every check, so a unit offering several capabilities is
//! instantiated only once. The exit code is non-zero when any check fails.

mod checks;

pub use checks::{CheckDescriptor, SUITE_CHECKS, suite_check_names, suite_checks};
