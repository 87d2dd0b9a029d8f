//! The check lifecycle.
//!
//! A [`Check`] is configured against a [`RunContext`], run once over the
//! archives of the run, and yields a [`CheckResult`]:
//!
//! ```text
//! check --configure--> Configured --run--> CheckResult
//!            \
//!             `------> Skipped (capability not bound)
//! ```
//!
//! [`Configured::run`] consumes the configured check, so a check cannot be run
//! twice. A check whose configuration capability has no binding is skipped:
//! it reports no failures and logs that it did not run.

use std::fmt;
use std::sync::Arc;

use log::info;

use assayer_common::PackageView;
use assayer_extensions::Capability;

use crate::context::RunContext;
use crate::error::Result;

/// Prefix of every failure message.
pub const FAIL_PREFIX: &str = "[FAIL]";

/// Format a failure message.
///
/// # Examples
///
/// ```
/// use assayer::fail_message;
///
/// let msg = fail_message(format_args!("{} is broken", "/srv/foo.tar"));
/// assert_eq!(msg, "[FAIL] /srv/foo.tar is broken");
/// ```
#[must_use]
pub fn fail_message(detail: impl fmt::Display) -> String {
    format!("{FAIL_PREFIX} {detail}")
}

/// Ordered failure messages of one check; empty means the check passed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckResult {
    messages: Vec<String>,
}

impl CheckResult {
    /// A passing result.
    #[must_use]
    pub fn passed() -> Self {
        Self::default()
    }

    /// Returns true when no failure was reported.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of failure messages.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.messages.len()
    }

    /// Failure messages in report order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Consume the result, returning its messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }

    /// Append a failure message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

impl From<Vec<String>> for CheckResult {
    fn from(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

impl FromIterator<String> for CheckResult {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl Extend<String> for CheckResult {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}

/// A validation rule over the archives of a run.
pub trait Check {
    /// Capability the check is configured with; [`assayer_extensions::NoConfig`]
    /// for checks that need none.
    type Config: Capability + ?Sized;

    /// Name used in logs and the skip notice.
    fn name(&self) -> &str;

    /// Evaluate `packages` and return the failure messages.
    ///
    /// # Errors
    ///
    /// Returns an error when an archive cannot be read; rule violations are
    /// reported as messages instead.
    fn run(
        &self,
        config: &Self::Config,
        ctx: &RunContext,
        packages: &mut dyn Iterator<Item = PackageView>,
    ) -> Result<CheckResult>;
}

/// Notice that a check did not run for lack of configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipped {
    /// Name of the skipped check.
    pub check: String,
    /// Capability that had no binding.
    pub capability: &'static str,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} skipped: no extension provides {}",
            self.check, self.capability
        )
    }
}

/// A check bound to its configuration, ready to run once.
pub struct Configured<K: Check> {
    check: K,
    config: Arc<K::Config>,
    ctx: RunContext,
}

impl<K: Check> Configured<K> {
    /// The configuration instance the check will run with.
    #[must_use]
    pub fn config(&self) -> &K::Config {
        &self.config
    }

    /// Run the check over `packages`, consuming it.
    ///
    /// # Errors
    ///
    /// Propagates the check's error.
    pub fn run(self, packages: impl IntoIterator<Item = PackageView>) -> Result<CheckResult> {
        let mut packages = packages.into_iter();
        self.check.run(&self.config, &self.ctx, &mut packages)
    }
}

/// Outcome of configuring a check.
pub enum Configuration<K: Check> {
    /// The capability is bound; the check can run.
    Ready(Configured<K>),
    /// The capability is unbound; the check will not run.
    Skipped(Skipped),
}

/// Resolve the configuration of `check` from `ctx`.
///
/// The check keeps its own child of `ctx`.
pub fn configure<K: Check>(check: K, ctx: &RunContext) -> Configuration<K> {
    match ctx.resolve::<K::Config>() {
        Some(config) => Configuration::Ready(Configured {
            check,
            config,
            ctx: ctx.child(),
        }),
        None => {
            let skipped = Skipped {
                check: Check::name(&check).to_owned(),
                capability: <K::Config as Capability>::NAME,
            };
            info!(target: ctx.log_target(), "{skipped}");
            Configuration::Skipped(skipped)
        }
    }
}

/// Final state of a check run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The check ran and produced a result.
    Completed(CheckResult),
    /// The check did not run.
    Skipped(Skipped),
}

impl Verdict {
    /// Failure messages; none for a skipped check.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Completed(result) => result.messages(),
            Self::Skipped(_) => &[],
        }
    }
}

/// Object-safe form of [`Check`], for running heterogeneous checks in turn.
pub trait DynCheck {
    /// Name of the check.
    fn name(&self) -> &str;

    /// Configure the check and run it over every archive in `ctx`.
    ///
    /// # Errors
    ///
    /// Propagates the check's error.
    fn execute(self: Box<Self>, ctx: &RunContext) -> Result<Verdict>;
}

impl<K: Check> DynCheck for K {
    fn name(&self) -> &str {
        Check::name(self)
    }

    fn execute(self: Box<Self>, ctx: &RunContext) -> Result<Verdict> {
        match configure(*self, ctx) {
            Configuration::Ready(configured) => {
                let packages = ctx.universe().iter().cloned();
                configured.run(packages).map(Verdict::Completed)
            }
            Configuration::Skipped(skipped) => Ok(Verdict::Skipped(skipped)),
        }
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
