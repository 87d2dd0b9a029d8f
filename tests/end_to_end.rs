//! End-to-end runs: archives on disk, a registry, checks and the printed
//! report with its exit code.

use std::io::Cursor;

use assayer::{
    Check, CheckError, CheckResult, CheckRunner, DynCheck, EXIT_FAILED, EXIT_FATAL, EXIT_PASSED,
    ElementRule, Elementwise, Result, RunContext, Settings, exit_code_for, fail_message,
};
use assayer_common::test_support::ArchiveFixture;
use assayer_common::{
    EntryKind, EntrySource, PackageView, RawEntry, dependency_closure, read_payload,
};
use assayer_extensions::NoConfig;
use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Binary `<source>-javadoc` packages must be `noarch`.
struct DocsAreNoarch;

impl ElementRule for DocsAreNoarch {
    type Config = NoConfig;

    fn name(&self) -> &str {
        "docs_are_noarch"
    }

    fn check_one(
        &self,
        _config: &NoConfig,
        _ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>> {
        if package.architecture() == "noarch" {
            return Ok(Vec::new());
        }
        Ok(vec![fail_message(format_args!(
            "{} is a javadoc package but its architecture is {}",
            package.path(),
            package.architecture()
        ))])
    }
}

fn docs_are_noarch() -> Elementwise<DocsAreNoarch> {
    Elementwise::new(DocsAreNoarch).with_filter(|package| {
        !package.is_source()
            && package.name().strip_suffix("-javadoc") == Some(package.source_package())
    })
}

/// Reports the closure of every archive requiring something.
struct ListClosures;

impl Check for ListClosures {
    type Config = NoConfig;

    fn name(&self) -> &str {
        "list_closures"
    }

    fn run(
        &self,
        _config: &NoConfig,
        ctx: &RunContext,
        packages: &mut dyn Iterator<Item = PackageView>,
    ) -> Result<CheckResult> {
        Ok(packages
            .filter(|package| !package.requires().is_empty())
            .map(|package| {
                let closure: Vec<&str> = dependency_closure(&package, ctx.universe())
                    .into_iter()
                    .map(PackageView::name)
                    .collect();
                fail_message(format_args!("{} -> {}", package.name(), closure.join(",")))
            })
            .collect())
    }
}

/// Container whose single symlink declares more bytes than it holds.
struct TruncatedLink;

impl EntrySource for TruncatedLink {
    fn visit_entries(
        &mut self,
        visitor: &mut dyn FnMut(RawEntry<'_>) -> assayer_common::Result<()>,
    ) -> assayer_common::Result<()> {
        let mut ok = Cursor::new(&b"/usr/share/java/ok.jar"[..]);
        visitor(RawEntry {
            name: "./usr/lib/ok.jar".to_owned(),
            size: 22,
            kind: EntryKind::Symlink,
            content: &mut ok,
        })?;
        let mut truncated = Cursor::new(&b"/usr"[..]);
        visitor(RawEntry {
            name: "./usr/lib/libfoo.so".to_owned(),
            size: 10,
            kind: EntryKind::Symlink,
            content: &mut truncated,
        })
    }
}

/// Reports every payload entry, after the container has been read in full.
struct ListPayload;

impl ElementRule for ListPayload {
    type Config = NoConfig;

    fn name(&self) -> &str {
        "list_payload"
    }

    fn check_one(
        &self,
        _config: &NoConfig,
        _ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>> {
        let entries = read_payload(&mut TruncatedLink)?;
        Ok(entries
            .into_iter()
            .map(|entry| fail_message(format_args!("{}: {}", package.name(), entry.path)))
            .collect())
    }
}

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn archive(&self, fixture: &ArchiveFixture, file_name: &str) -> Utf8PathBuf {
        fixture
            .write(&self.root.join("archives"), file_name)
            .expect("write archive")
    }

    fn run(&self, checks: Vec<Box<dyn DynCheck>>, inputs: &[Utf8PathBuf]) -> Outcome {
        let settings = Settings::default().with_overrides(
            Some(self.root.join("config/src")),
            Some(self.root.join("config/bin")),
        );
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result = CheckRunner::from_settings(&settings).run(checks, inputs, &mut stderr);
        let code = exit_code_for(result, &mut stdout, &mut stderr);
        Outcome {
            code,
            stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
        }
    }
}

struct Outcome {
    code: i32,
    stdout: String,
    stderr: String,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = Utf8Path::from_path(dir.path())
        .expect("temp dir is UTF-8")
        .to_owned();
    std::fs::create_dir(root.join("archives")).expect("create archive dir");
    Workspace { _dir: dir, root }
}

#[rstest]
fn no_archives_pass(workspace: Workspace) {
    let outcome = workspace.run(vec![Box::new(docs_are_noarch())], &[]);

    assert_eq!(outcome.code, EXIT_PASSED);
    assert!(outcome.stdout.is_empty());
    assert_eq!(outcome.stderr, "Summary: all tests passed\n");
}

#[rstest]
fn arch_specific_javadoc_package_fails(workspace: Workspace) {
    let path = workspace.archive(
        &ArchiveFixture::binary("foo-javadoc", "x86_64", "foo-1.0-1.src.tar"),
        "foo-javadoc-1.0-1.x86_64.tar",
    );

    let outcome = workspace.run(vec![Box::new(docs_are_noarch())], &[path.clone()]);

    assert_eq!(outcome.code, EXIT_FAILED);
    assert_eq!(
        outcome.stdout,
        format!("[FAIL] {path} is a javadoc package but its architecture is x86_64\n")
    );
    assert!(outcome.stdout.contains("x86_64"));
    assert_eq!(outcome.stderr, "Summary: 1 tests failed\n");
}

#[rstest]
fn closure_follows_requirements_transitively(workspace: Workspace) {
    let a = workspace.archive(
        &ArchiveFixture::binary("a", "x86_64", "a-1-1.src.tar").requires(&["libx.so"]),
        "a-1-1.x86_64.tar.gz",
    );
    let b = workspace.archive(
        &ArchiveFixture::binary("b", "x86_64", "b-1-1.src.tar")
            .provides(&["libx.so"])
            .requires(&["liby.so"]),
        "b-1-1.x86_64.tar.zst",
    );
    let c = workspace.archive(
        &ArchiveFixture::binary("c", "x86_64", "c-1-1.src.tar").provides(&["liby.so"]),
        "c-1-1.x86_64.tar",
    );

    let outcome = workspace.run(vec![Box::new(ListClosures)], &[a, b, c]);

    assert_eq!(outcome.code, EXIT_FAILED);
    assert_eq!(outcome.stdout, "[FAIL] a -> b,c\n[FAIL] b -> c\n");
}

#[rstest]
fn incomplete_read_is_fatal_without_partial_output(workspace: Workspace) {
    let path = workspace.archive(&ArchiveFixture::source("foo", "src"), "foo-1.0-1.src.tar");
    let checks: Vec<Box<dyn DynCheck>> = vec![
        Box::new(ListClosures),
        Box::new(docs_are_noarch()),
        Box::new(Elementwise::new(ListPayload)),
    ];

    let outcome = workspace.run(checks, &[path]);

    assert_eq!(outcome.code, EXIT_FATAL);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.contains("incomplete read"));
    assert!(outcome.stderr.contains("declares 10 bytes, got 4"));
    assert!(!outcome.stderr.contains("Summary"));
}

#[test]
fn incomplete_read_error_names_the_entry() {
    let err = CheckError::from(read_payload(&mut TruncatedLink).expect_err("truncated"));

    assert!(err.to_string().contains("./usr/lib/libfoo.so"));
}
