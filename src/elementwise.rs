//! Checks that judge each archive on its own.
//!
//! An [`ElementRule`] evaluates one archive. [`Elementwise`] turns a rule into
//! a [`Check`]: it collects the inputs, drops those rejected by its filter,
//! evaluates the rest on scoped worker threads and concatenates the messages
//! in input order. The first error in input order aborts the run.

use std::num::NonZeroUsize;
use std::thread;

use assayer_common::PackageView;
use assayer_extensions::Capability;

use crate::check::{Check, CheckResult};
use crate::context::RunContext;
use crate::error::Result;

/// Predicate selecting the archives a rule applies to.
pub type Filter = Box<dyn Fn(&PackageView) -> bool + Send + Sync>;

/// A rule evaluated independently for every archive.
pub trait ElementRule: Sync {
    /// Capability the rule is configured with.
    type Config: Capability + ?Sized;

    /// Name of the rule.
    fn name(&self) -> &str;

    /// Evaluate one archive and return its failure messages.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive cannot be read.
    fn check_one(
        &self,
        config: &Self::Config,
        ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>>;
}

/// [`Check`] applying an [`ElementRule`] to every archive its filter accepts.
pub struct Elementwise<R> {
    rule: R,
    filter: Filter,
    workers: NonZeroUsize,
}

impl<R: ElementRule> Elementwise<R> {
    /// Wrap `rule` with an always-true filter.
    #[must_use]
    pub fn new(rule: R) -> Self {
        Self {
            rule,
            filter: Box::new(|_| true),
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Replace the filter.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&PackageView) -> bool + Send + Sync + 'static,
    {
        self.filter = Box::new(filter);
        self
    }

    /// Limit evaluation to `workers` threads.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    /// The wrapped rule.
    #[must_use]
    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// Returns true if `package` passes the filter.
    #[must_use]
    pub fn accepts(&self, package: &PackageView) -> bool {
        (self.filter)(package)
    }

    fn evaluate_all(
        &self,
        config: &R::Config,
        ctx: &RunContext,
        packages: &[PackageView],
    ) -> Result<Vec<Vec<String>>> {
        let workers = self.workers.get().min(packages.len());
        if workers <= 1 {
            return self.evaluate_chunk(config, ctx, packages);
        }

        let chunk_size = packages.len().div_ceil(workers);
        let chunk_results: Vec<Result<Vec<Vec<String>>>> = thread::scope(|scope| {
            let handles: Vec<_> = packages
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || self.evaluate_chunk(config, ctx, chunk)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        let mut messages = Vec::with_capacity(packages.len());
        for result in chunk_results {
            messages.extend(result?);
        }
        Ok(messages)
    }

    fn evaluate_chunk(
        &self,
        config: &R::Config,
        ctx: &RunContext,
        chunk: &[PackageView],
    ) -> Result<Vec<Vec<String>>> {
        chunk
            .iter()
            .map(|package| self.rule.check_one(config, ctx, package))
            .collect()
    }
}

impl<R: ElementRule> Check for Elementwise<R> {
    type Config = R::Config;

    fn name(&self) -> &str {
        self.rule.name()
    }

    fn run(
        &self,
        config: &R::Config,
        ctx: &RunContext,
        packages: &mut dyn Iterator<Item = PackageView>,
    ) -> Result<CheckResult> {
        let selected: Vec<PackageView> = packages.filter(|package| self.accepts(package)).collect();
        let messages = self.evaluate_all(config, ctx, &selected)?;
        Ok(messages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
#[path = "elementwise_tests.rs"]
mod tests;
