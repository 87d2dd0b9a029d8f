//! Integration tests for extension discovery across registry lifetimes.
//!
//! Each test builds fresh registries over the same directories, the way
//! separate check invocations share one compiled-output cache.

use std::fs::{self, File};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use assayer_extensions::{
    Capability, Compiler, ExtensionError, ExtensionRegistry, NoConfig, Registrar, RegistryDirs,
    Result, StaticLoader, StubCompiler,
};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

trait Greeting: Send + Sync {
    fn text(&self) -> String;
}

impl Capability for dyn Greeting {
    const NAME: &'static str = "Greeting";
}

trait Volume: Send + Sync {
    fn level(&self) -> u8;
}

impl Capability for dyn Volume {
    const NAME: &'static str = "Volume";
}

struct Polite;

impl Greeting for Polite {
    fn text(&self) -> String {
        "good morning".to_owned()
    }
}

impl Volume for Polite {
    fn level(&self) -> u8 {
        2
    }
}

struct Loud;

impl Greeting for Loud {
    fn text(&self) -> String {
        "HEY".to_owned()
    }
}

fn register_polite(registrar: &mut Registrar<'_>) -> std::result::Result<(), String> {
    let instance = Arc::new(Polite);
    registrar
        .offer::<dyn Greeting>(instance.clone())
        .offer::<dyn Volume>(instance);
    Ok(())
}

fn register_loud(registrar: &mut Registrar<'_>) -> std::result::Result<(), String> {
    registrar.offer::<dyn Greeting>(Arc::new(Loud));
    Ok(())
}

/// Stub compiler that counts its invocations.
#[derive(Clone, Default)]
struct CountingCompiler {
    runs: Arc<AtomicUsize>,
}

impl CountingCompiler {
    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Compiler for CountingCompiler {
    fn compile(&self, source_dir: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        StubCompiler.compile(source_dir, output_dir)
    }
}

struct FailingCompiler;

impl Compiler for FailingCompiler {
    fn compile(&self, source_dir: &Utf8Path, _output_dir: &Utf8Path) -> Result<()> {
        Err(ExtensionError::CompilationFailed {
            source_file: source_dir.join("a_polite.rs"),
            diagnostics: "error[E0433]: failed to resolve: use of undeclared crate".to_owned(),
        })
    }
}

struct Workspace {
    _temp: TempDir,
    dirs: RegistryDirs,
}

#[fixture]
fn workspace() -> Workspace {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("non-UTF8 temp path");
    let dirs = RegistryDirs::new(root.join("config/src"), root.join("config/bin"));
    fs::create_dir_all(&dirs.source_dir).expect("create source dir");
    for name in ["a_polite.rs", "b_loud.rs"] {
        fs::write(dirs.source_dir.join(name), b"// extension").expect("write source");
    }
    Workspace { _temp: temp, dirs }
}

fn registry(dirs: &RegistryDirs, compiler: impl Compiler + 'static) -> ExtensionRegistry {
    let loader = StaticLoader::new()
        .with_unit("a_polite", register_polite)
        .with_unit("b_loud", register_loud);
    ExtensionRegistry::with_parts(dirs.clone(), Box::new(compiler), Box::new(loader))
}

fn set_mtime(path: &Utf8Path, modified: SystemTime) {
    File::open(path)
        .and_then(|file| file.set_modified(modified))
        .expect("set mtime");
}

#[rstest]
fn one_instance_backs_every_capability_of_a_unit(workspace: Workspace) {
    let registry = registry(&workspace.dirs, CountingCompiler::default());

    let greeting = registry
        .resolve::<dyn Greeting>()
        .expect("discovery")
        .expect("greeting bound");
    let volume = registry
        .resolve::<dyn Volume>()
        .expect("discovery")
        .expect("volume bound");

    assert_eq!(greeting.text(), "good morning");
    assert_eq!(volume.level(), 2);
}

#[rstest]
fn binding_is_stable_across_runs(workspace: Workspace) {
    let providers: Vec<String> = (0..3)
        .map(|_| {
            let bindings = registry(&workspace.dirs, CountingCompiler::default())
                .bindings()
                .expect("discovery");
            bindings
                .provider_of::<dyn Greeting>()
                .map(str::to_owned)
                .expect("greeting bound")
        })
        .collect();

    assert_eq!(providers, ["a_polite", "a_polite", "a_polite"]);
}

#[rstest]
fn cache_is_reused_until_a_source_changes(workspace: Workspace) {
    let compiler = CountingCompiler::default();

    registry(&workspace.dirs, compiler.clone())
        .bindings()
        .expect("first discovery");
    assert_eq!(compiler.runs(), 1);

    let past = SystemTime::now() - Duration::from_secs(600);
    for name in ["a_polite.rs", "b_loud.rs"] {
        set_mtime(&workspace.dirs.source_dir.join(name), past);
    }
    set_mtime(&workspace.dirs.source_dir, past);

    registry(&workspace.dirs, compiler.clone())
        .bindings()
        .expect("cached discovery");
    assert_eq!(compiler.runs(), 1);

    set_mtime(
        &workspace.dirs.source_dir.join("b_loud.rs"),
        SystemTime::now() + Duration::from_secs(600),
    );

    registry(&workspace.dirs, compiler.clone())
        .bindings()
        .expect("rebuilding discovery");
    assert_eq!(compiler.runs(), 2);
}

#[rstest]
fn emptied_cache_is_rebuilt(workspace: Workspace) {
    let compiler = CountingCompiler::default();
    registry(&workspace.dirs, compiler.clone())
        .bindings()
        .expect("first discovery");

    fs::remove_dir_all(&workspace.dirs.output_dir).expect("remove cache");
    registry(&workspace.dirs, compiler.clone())
        .bindings()
        .expect("second discovery");

    assert_eq!(compiler.runs(), 2);
}

#[rstest]
fn compilation_failure_aborts_discovery(workspace: Workspace) {
    let registry = registry(&workspace.dirs, FailingCompiler);

    let err = registry
        .resolve::<NoConfig>()
        .expect_err("compilation failure is fatal");

    assert!(err.to_string().contains("E0433"));
}

#[rstest]
fn unbound_capability_resolves_to_none(workspace: Workspace) {
    trait Unused: Send + Sync {}
    impl Capability for dyn Unused {
        const NAME: &'static str = "Unused";
    }

    let registry = registry(&workspace.dirs, CountingCompiler::default());

    assert!(registry.resolve::<dyn Unused>().expect("discovery").is_none());
}
