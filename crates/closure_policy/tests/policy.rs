//! Runs `closure_policy` with and without a policy extension.
//!
//! Extension units are linked statically and "compiled" by the stub compiler,
//! so the registry goes through discovery without a toolchain.

use std::sync::Arc;

use assayer::{CheckRunner, DynCheck, EXIT_FAILED, EXIT_PASSED, RunContext, exit_code_for};
use assayer_common::{ArchiveError, PackageSource, PackageView};
use assayer_extensions::{ExtensionRegistry, Registrar, RegistryDirs, StaticLoader, StubCompiler};
use camino::{Utf8Path, Utf8PathBuf};
use closure_policy::ClosurePolicy;
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Allows dependencies on `noarch` archives only.
struct NoarchDependencies;

impl ClosurePolicy for NoarchDependencies {
    fn allowed(&self, _package: &PackageView, dependency: &PackageView) -> bool {
        dependency.architecture() == "noarch"
    }
}

fn register_noarch(registrar: &mut Registrar<'_>) -> Result<(), String> {
    registrar.offer::<dyn ClosurePolicy>(Arc::new(NoarchDependencies));
    Ok(())
}

struct Setup {
    _dir: TempDir,
    dirs: RegistryDirs,
}

#[fixture]
fn setup() -> Setup {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8");
    let dirs = RegistryDirs::new(root.join("src"), root.join("bin"));
    Setup { _dir: dir, dirs }
}

fn runner(dirs: &RegistryDirs) -> CheckRunner {
    let registry = ExtensionRegistry::with_parts(
        dirs.clone(),
        Box::new(StubCompiler),
        Box::new(StaticLoader::new().with_unit("policies::noarch", register_noarch)),
    );
    CheckRunner::new(registry)
}

/// Serves the views of [`universe`] by path.
struct MemoryPackages(Vec<PackageView>);

impl PackageSource for MemoryPackages {
    fn open(&self, path: &Utf8Path) -> assayer_common::Result<PackageView> {
        self.0
            .iter()
            .find(|package| package.path() == path)
            .cloned()
            .ok_or_else(|| ArchiveError::UnsupportedFormat {
                path: path.to_owned(),
            })
    }
}

fn write_policy_source(dirs: &RegistryDirs) {
    std::fs::create_dir_all(dirs.source_dir.join("policies")).expect("create source dir");
    std::fs::write(dirs.source_dir.join("policies/noarch.rs"), "// policy")
        .expect("write source");
}

fn universe() -> Vec<PackageView> {
    let binary = |name: &str, arch: &str| {
        PackageView::binary(format!("/srv/{name}.tar"), name, arch, "app-1.0-1.src.tar")
            .expect("source archive name is valid")
    };
    vec![
        binary("app", "x86_64").with_requires(["libcore.so", "docs"]),
        binary("core", "x86_64").with_provides(["libcore.so"]),
        binary("docs", "noarch").with_provides(["docs"]),
        PackageView::source("/srv/app.src.tar", "app", "src").with_requires(["libcore.so"]),
    ]
}

#[rstest]
fn configured_policy_reports_disallowed_dependencies(setup: Setup) {
    write_policy_source(&setup.dirs);
    let runner = runner(&setup.dirs);
    let ctx = RunContext::new(
        runner.registry().bindings().expect("discovery succeeds"),
        setup.dirs.clone(),
        universe(),
    );

    let verdict = Box::new(closure_policy::check())
        .execute(&ctx)
        .expect("check runs");

    assert_eq!(
        verdict.messages(),
        [
            "[FAIL] /srv/app.tar depends on /srv/core.tar, \
             which the closure policy does not allow"
        ]
    );
}

#[rstest]
fn missing_policy_skips_the_check(setup: Setup) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let checks: Vec<Box<dyn DynCheck>> = vec![Box::new(closure_policy::check())];
    let result = runner(&setup.dirs).run(checks, &[], &mut stderr);

    let code = exit_code_for(result, &mut stdout, &mut stderr);

    assert_eq!(code, EXIT_PASSED);
    assert!(stdout.is_empty());
    let stderr = String::from_utf8(stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("closure_policy skipped: no extension provides ClosurePolicy"));
}

#[rstest]
fn failures_set_the_exit_code(setup: Setup) {
    write_policy_source(&setup.dirs);
    let runner = runner(&setup.dirs).with_package_source(MemoryPackages(universe()));
    let inputs: Vec<Utf8PathBuf> =
        universe().iter().map(|package| package.path().to_owned()).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let result = runner.run(vec![Box::new(closure_policy::check())], &inputs, &mut stderr);
    let code = exit_code_for(result, &mut stdout, &mut stderr);

    assert_eq!(code, EXIT_FAILED);
    assert_eq!(
        String::from_utf8(stdout).expect("stdout is UTF-8"),
        "[FAIL] /srv/app.tar depends on /srv/core.tar, which the closure policy does not allow\n"
    );
}
