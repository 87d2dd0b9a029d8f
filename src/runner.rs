//! Command-line driver shared by the check binaries.
//!
//! A run resolves the extension bindings, reads the metadata of every input
//! archive, executes the checks in turn and only then prints the failure
//! messages, so a fatal error never leaves partial results on stdout.
//!
//! Exit codes: [`EXIT_PASSED`] when every check passed or was skipped,
//! [`EXIT_FAILED`] when at least one failure was reported and [`EXIT_FATAL`]
//! when the run was aborted.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::{debug, info};

use assayer_common::{PackageSource, PackageView, TarPackageSource, expand_inputs};
use assayer_extensions::{DylibLoader, ExtensionRegistry};

use crate::check::{DynCheck, Skipped, Verdict};
use crate::config::Settings;
use crate::context::{DEFAULT_LOG_TARGET, RunContext};
use crate::error::{CheckError, Result};

/// Exit code of a run without failures.
pub const EXIT_PASSED: i32 = 0;
/// Exit code of a run reporting at least one failure.
pub const EXIT_FAILED: i32 = 1;
/// Exit code of an aborted run.
pub const EXIT_FATAL: i32 = 2;

/// Command-line options of a check binary.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(version, about = "Validate distribution archives")]
pub struct Invocation {
    /// Directory holding extension sources [default: from settings].
    #[arg(long = "config-src", value_name = "DIR")]
    pub config_src: Option<Utf8PathBuf>,

    /// Directory caching compiled extensions [default: from settings].
    #[arg(long = "config-bin", value_name = "DIR")]
    pub config_bin: Option<Utf8PathBuf>,

    /// Archive files, or directories searched for archives.
    #[arg(value_name = "ARCHIVE", value_parser = archive_operand)]
    pub archives: Vec<Utf8PathBuf>,
}

/// Parse an archive operand, rejecting option-like tokens even after `--`.
fn archive_operand(token: &str) -> std::result::Result<Utf8PathBuf, String> {
    if token.starts_with('-') {
        return Err(format!("unrecognized option '{token}'"));
    }
    Ok(Utf8PathBuf::from(token))
}

impl Invocation {
    /// Apply the directory options of this invocation to `settings`.
    #[must_use]
    pub fn apply_to(&self, settings: Settings) -> Settings {
        settings.with_overrides(self.config_src.clone(), self.config_bin.clone())
    }
}

/// Aggregated outcome of the checks of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    messages: Vec<String>,
    skipped: Vec<Skipped>,
}

impl Report {
    /// Failure messages of every check, in check order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Checks that did not run.
    #[must_use]
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Number of failure messages.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.messages.len()
    }

    /// Returns true when no failure was reported.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.messages.is_empty()
    }

    /// Exit code for this report.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_passed() {
            EXIT_PASSED
        } else {
            EXIT_FAILED
        }
    }

    /// The closing summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_passed() {
            "Summary: all tests passed".to_owned()
        } else {
            format!("Summary: {} tests failed", self.failures())
        }
    }

    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Completed(result) => self.messages.extend(result.into_messages()),
            Verdict::Skipped(skipped) => self.skipped.push(skipped),
        }
    }
}

/// Runs checks over archives with one memoized extension registry.
pub struct CheckRunner {
    registry: ExtensionRegistry,
    packages: Box<dyn PackageSource>,
}

impl CheckRunner {
    /// Create a runner reading tar archives.
    #[must_use]
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self {
            registry,
            packages: Box::new(TarPackageSource),
        }
    }

    /// Create a runner whose registry compiles and loads as `settings` say.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(ExtensionRegistry::with_parts(
            settings.registry_dirs(),
            Box::new(settings.compiler.compiler()),
            Box::new(DylibLoader::new()),
        ))
    }

    /// Replace the archive metadata reader.
    #[must_use]
    pub fn with_package_source(mut self, packages: impl PackageSource + 'static) -> Self {
        self.packages = Box::new(packages);
        self
    }

    /// The registry this runner resolves configuration through.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Expand `inputs` and read the metadata of every archive, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be expanded or an archive
    /// cannot be read.
    pub fn load_packages(&self, inputs: &[Utf8PathBuf]) -> Result<Vec<PackageView>> {
        let paths = expand_inputs(inputs)?;
        debug!(target: DEFAULT_LOG_TARGET, "archives: {paths:?}");
        paths
            .iter()
            .map(|path| self.packages.open(path).map_err(CheckError::from))
            .collect()
    }

    /// Build the context of a run over `inputs`.
    ///
    /// Extension discovery happens here, before any check executes.
    ///
    /// # Errors
    ///
    /// Returns an error if the extensions cannot be built or an input
    /// cannot be read.
    pub fn context(&self, inputs: &[Utf8PathBuf]) -> Result<RunContext> {
        let bindings = self.registry.bindings()?;
        let universe = self.load_packages(inputs)?;
        Ok(RunContext::new(bindings, self.registry.dirs().clone(), universe))
    }

    /// Run `checks` in turn over `inputs`.
    ///
    /// A skip notice is written to `stderr` for each check that does not run.
    /// Failure messages are collected in the returned [`Report`].
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; no report is produced in that case.
    pub fn run(
        &self,
        checks: Vec<Box<dyn DynCheck>>,
        inputs: &[Utf8PathBuf],
        stderr: &mut dyn Write,
    ) -> Result<Report> {
        let ctx = self.context(inputs)?;
        let mut report = Report::default();

        for check in checks {
            debug!(target: ctx.log_target(), "running {}", check.name());
            let verdict = check.execute(&ctx)?;
            if let Verdict::Skipped(skipped) = &verdict {
                write_stderr_line(stderr, skipped);
            }
            report.record(verdict);
        }

        Ok(report)
    }
}

/// Print the outcome of a run and return its exit code.
///
/// Messages go to `stdout`, one per line, followed by the summary on
/// `stderr`. A fatal error prints only a diagnostic on `stderr`.
pub fn exit_code_for(
    result: Result<Report>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(report) => {
            for message in report.messages() {
                write_line(stdout, message);
            }
            let summary = report.summary();
            info!(target: DEFAULT_LOG_TARGET, "{summary}");
            write_stderr_line(stderr, &summary);
            report.exit_code()
        }
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                write_stderr_line(stderr, format_args!("  caused by: {cause}"));
                source = cause.source();
            }
            EXIT_FATAL
        }
    }
}

/// Load settings, run `checks` as `invocation` asks and report the outcome.
///
/// This is the whole body of a check binary's `main`.
pub fn main_with(
    invocation: &Invocation,
    checks: Vec<Box<dyn DynCheck>>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let result = Settings::load().and_then(|settings| {
        let settings = invocation.apply_to(settings);
        debug!(target: DEFAULT_LOG_TARGET, "settings: {settings:?}");
        CheckRunner::from_settings(&settings).run(checks, &invocation.archives, stderr)
    });
    exit_code_for(result, stdout, stderr)
}

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    write_line(stderr, message);
}

fn write_line(sink: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(sink, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
