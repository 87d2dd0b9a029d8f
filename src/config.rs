//! Runner settings.
//!
//! Settings come from the TOML file named by [`CONFIG_ENV`] when it is set,
//! and from built-in defaults otherwise. Command-line options override the
//! extension directories afterwards.
//!
//! ```toml
//! source_dir = "/mnt/config/src"
//! output_dir = "/mnt/config/bin"
//!
//! [compiler]
//! program = "rustc"
//! edition = "2024"
//! args = ["-L", "/usr/lib/assayer"]
//! timeout_secs = 300
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use assayer_extensions::compiler::{DEFAULT_EDITION, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
use assayer_extensions::{DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_DIR, RegistryDirs, RustcCompiler};

use crate::error::{CheckError, Result};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "ASSAYER_CONFIG";

/// Settings shared by every check binary.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding extension sources.
    pub source_dir: Utf8PathBuf,
    /// Directory caching compiled extension units.
    pub output_dir: Utf8PathBuf,
    /// How extension sources are compiled.
    pub compiler: CompilerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: Utf8PathBuf::from(DEFAULT_SOURCE_DIR),
            output_dir: Utf8PathBuf::from(DEFAULT_OUTPUT_DIR),
            compiler: CompilerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by [`CONFIG_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if the named file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with(CONFIG_ENV, |name| std::env::var(name).ok())
    }

    /// Load settings using `lookup` to read the environment.
    ///
    /// A missing or blank variable yields the defaults. The indirection lets
    /// tests supply the environment without touching the process.
    ///
    /// # Examples
    ///
    /// ```
    /// use assayer::Settings;
    ///
    /// let settings = Settings::load_with("ASSAYER_CONFIG", |_| None).expect("defaults");
    /// assert_eq!(settings.source_dir, "/mnt/config/src");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the named file cannot be read or parsed.
    pub fn load_with<F>(variable: &str, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(variable) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Utf8Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    /// Read settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::SettingsRead`] if the file cannot be read and
    /// [`CheckError::InvalidSettings`] if it does not parse.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::SettingsRead {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&text).map_err(|err| CheckError::InvalidSettings {
            path: path.to_owned(),
            reason: err.message().to_owned(),
        })
    }

    /// Replace the extension directories given on the command line.
    #[must_use]
    pub fn with_overrides(
        mut self,
        source_dir: Option<Utf8PathBuf>,
        output_dir: Option<Utf8PathBuf>,
    ) -> Self {
        if let Some(dir) = source_dir {
            self.source_dir = dir;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }

    /// Directories for the extension registry.
    #[must_use]
    pub fn registry_dirs(&self) -> RegistryDirs {
        RegistryDirs::new(self.source_dir.clone(), self.output_dir.clone())
    }
}

/// Settings for the extension compiler.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSettings {
    /// Compiler program.
    pub program: String,
    /// Edition passed to the compiler.
    pub edition: String,
    /// Extra compiler arguments.
    pub args: Vec<String>,
    /// Deadline for compiling one source, in seconds.
    pub timeout_secs: u64,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
            edition: DEFAULT_EDITION.to_owned(),
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl CompilerSettings {
    /// Build the compiler these settings describe.
    #[must_use]
    pub fn compiler(&self) -> RustcCompiler {
        RustcCompiler::new(self.program.clone())
            .with_edition(self.edition.clone())
            .with_args(self.args.iter().cloned())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_point_at_the_build_mount() {
        let settings = Settings::default();

        assert_eq!(settings.source_dir, "/mnt/config/src");
        assert_eq!(settings.output_dir, "/mnt/config/bin");
        assert_eq!(settings.compiler.program, "rustc");
        assert_eq!(settings.compiler.timeout_secs, 300);
    }

    #[rstest]
    fn deserialises_partial_overrides() {
        let source = "source_dir = \"/srv/ext\"\n[compiler]\nargs = [\"-L\", \"/opt/lib\"]\n";

        let settings = toml::from_str::<Settings>(source)
            .expect("expected configuration to parse successfully");

        assert_eq!(settings.source_dir, "/srv/ext");
        assert_eq!(settings.output_dir, "/mnt/config/bin");
        assert_eq!(settings.compiler.args, ["-L", "/opt/lib"]);
        assert_eq!(settings.compiler.edition, "2024");
    }

    #[rstest]
    fn rejects_unknown_fields() {
        let outcome: std::result::Result<Settings, _> = toml::from_str("colour = true\n");

        assert!(
            outcome.is_err(),
            "expected a parse error when unknown fields are present"
        );
    }

    #[rstest]
    #[case::unset(None)]
    #[case::blank(Some("   "))]
    fn missing_variable_yields_defaults(#[case] value: Option<&str>) {
        let settings = Settings::load_with(CONFIG_ENV, |name| {
            assert_eq!(name, CONFIG_ENV);
            value.map(str::to_owned)
        })
        .expect("defaults should load");

        assert_eq!(settings, Settings::default());
    }

    #[rstest]
    fn unreadable_file_is_reported() {
        let err = Settings::load_with(CONFIG_ENV, |_| Some("/nonexistent/assayer.toml".to_owned()))
            .expect_err("missing file should fail");

        assert!(matches!(err, CheckError::SettingsRead { .. }));
    }

    #[rstest]
    fn command_line_overrides_replace_directories() {
        let settings =
            Settings::default().with_overrides(Some(Utf8PathBuf::from("/tmp/src")), None);

        assert_eq!(settings.registry_dirs(), RegistryDirs::new("/tmp/src", "/mnt/config/bin"));
    }
}
