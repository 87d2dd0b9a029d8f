//! Assayer runs independent checks over distribution archives.
//!
//! A [`Check`] is configured through capabilities resolved by the extension
//! registry, runs once over the archives of an invocation and reports failure
//! messages. [`Elementwise`] adapts a per-archive [`ElementRule`] into a check
//! that evaluates archives in parallel. [`CheckRunner`] drives a run from the
//! command line.

pub mod check;
pub mod config;
pub mod context;
pub mod elementwise;
pub mod error;
pub mod runner;

pub use check::{
    Check, CheckResult, Configuration, Configured, DynCheck, FAIL_PREFIX, Skipped, Verdict,
    configure, fail_message,
};
pub use config::{CONFIG_ENV, CompilerSettings, Settings};
pub use context::{DEFAULT_LOG_TARGET, RunContext};
pub use elementwise::{ElementRule, Elementwise, Filter};
pub use error::{CheckError, Result};
pub use runner::{
    CheckRunner, EXIT_FAILED, EXIT_FATAL, EXIT_PASSED, Invocation, Report, exit_code_for,
    main_with, write_stderr_line,
};
