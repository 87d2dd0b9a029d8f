//! Compiler collaborator turning extension sources into loadable units.
//!
//! Every `*.rs` file below the source directory is compiled on its own into a
//! `cdylib` at the mirrored location below the output directory (see
//! [`crate::scanner::unit_path_for`]).

use std::io::{self, Read};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use wait_timeout::ChildExt;

use crate::error::{ExtensionError, Result};
use crate::scanner::{scan_sources, unit_path_for};

/// Default compiler program.
pub const DEFAULT_PROGRAM: &str = "rustc";

/// Default Rust edition for extension sources.
pub const DEFAULT_EDITION: &str = "2024";

/// Default deadline for compiling a single source (5 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Compiles every extension source into the output directory.
#[cfg_attr(test, mockall::automock)]
pub trait Compiler: Send + Sync {
    /// Compile all sources below `source_dir` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the compiler is unavailable, rejects a source or
    /// exceeds its deadline.
    fn compile(&self, source_dir: &Utf8Path, output_dir: &Utf8Path) -> Result<()>;
}

/// [`Compiler`] invoking `rustc` once per source file.
#[derive(Debug, Clone)]
pub struct RustcCompiler {
    program: String,
    edition: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for RustcCompiler {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
            edition: DEFAULT_EDITION.to_owned(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RustcCompiler {
    /// Create a compiler using `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Set the edition passed with `--edition`.
    #[must_use]
    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = edition.into();
        self
    }

    /// Append extra arguments, typically `--extern` and `-L` flags that make
    /// the extension API crate visible to the sources.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the deadline for each source.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program invoked for each source.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, source: &Utf8Path, unit: &Utf8Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--edition", &self.edition]);
        cmd.args(["--crate-type", "cdylib"]);
        cmd.args(["--crate-name", &crate_name(source)]);
        cmd.arg("-o").arg(unit.as_str());
        cmd.args(&self.args);
        cmd.arg(source.as_str());
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    fn compile_one(&self, source: &Utf8Path, unit: &Utf8Path) -> Result<()> {
        if let Some(parent) = unit.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!("compiling {source} into {unit}");
        let output = self.run_with_timeout(source, unit)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtensionError::CompilationFailed {
                source_file: source.to_owned(),
                diagnostics: stderr.trim().to_owned(),
            });
        }

        Ok(())
    }

    /// Run the compiler for one source, killing it when the deadline passes.
    ///
    /// Both pipes are drained while waiting so that a compiler producing more
    /// output than a pipe holds cannot block on its writes.
    fn run_with_timeout(&self, source: &Utf8Path, unit: &Utf8Path) -> Result<Output> {
        let mut child = self.command(source, unit).spawn().map_err(|err| {
            ExtensionError::CompilerUnavailable {
                program: self.program.clone(),
                reason: err.to_string(),
            }
        })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|scope| {
            let stdout = scope.spawn(move || drain(stdout));
            let stderr = scope.spawn(move || drain(stderr));

            let status = match child.wait_timeout(self.timeout) {
                Ok(status) => status,
                Err(err) => {
                    stop(&mut child);
                    return Err(err.into());
                }
            };
            if status.is_none() {
                stop(&mut child);
            }
            let stdout = join_reader(stdout)?;
            let stderr = join_reader(stderr)?;

            let Some(status) = status else {
                return Err(ExtensionError::CompilerTimedOut {
                    source_file: source.to_owned(),
                    seconds: self.timeout.as_secs(),
                });
            };
            Ok(Output {
                status,
                stdout,
                stderr,
            })
        })
    }
}

fn drain(pipe: Option<impl Read>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join_reader(reader: ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    reader
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("compiler output reader panicked")))
}

fn stop(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("failed to kill compiler process {}: {err}", child.id());
    }
    if let Err(err) = child.wait() {
        debug!("failed to reap compiler process {}: {err}", child.id());
    }
}

impl Compiler for RustcCompiler {
    fn compile(&self, source_dir: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        for (source, unit) in planned_units(source_dir, output_dir)? {
            self.compile_one(&source, &unit)?;
        }
        Ok(())
    }
}

/// Pair each source below `source_dir` with the unit it compiles to.
///
/// # Errors
///
/// Returns an error if the source directory cannot be walked.
pub fn planned_units(
    source_dir: &Utf8Path,
    output_dir: &Utf8Path,
) -> Result<Vec<(Utf8PathBuf, Utf8PathBuf)>> {
    Ok(scan_sources(source_dir)?
        .into_iter()
        .filter_map(|source| {
            let unit = unit_path_for(source_dir, output_dir, &source)?;
            Some((source, unit))
        })
        .collect())
}

/// Crate name for a source file: its stem with non-identifier characters
/// replaced by underscores.
fn crate_name(source: &Utf8Path) -> String {
    source
        .file_stem()
        .unwrap_or("extension")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// [`Compiler`] that writes an empty placeholder for every unit.
///
/// Pair it with [`crate::StaticLoader`] to exercise the registry without a
/// toolchain.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct StubCompiler;

#[cfg(any(test, feature = "test-support"))]
impl Compiler for StubCompiler {
    fn compile(&self, source_dir: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        for (_, unit) in planned_units(source_dir, output_dir)? {
            if let Some(parent) = unit.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&unit, b"")?;
        }
        Ok(())
    }
}
