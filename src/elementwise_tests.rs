//! Tests for elementwise checks.

use super::*;
use crate::check::{Configuration, configure, fail_message};
use crate::error::CheckError;
use assayer_extensions::{Bindings, NoConfig, RegistryDirs};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

/// Emits one message per package, or two for names containing `twice`.
/// Packages named `broken-*` fail to evaluate.
struct Echo;

impl ElementRule for Echo {
    type Config = NoConfig;

    fn name(&self) -> &str {
        "echo"
    }

    fn check_one(
        &self,
        _config: &NoConfig,
        _ctx: &RunContext,
        package: &PackageView,
    ) -> Result<Vec<String>> {
        // Later packages finish first, so ordering relies on reassembly.
        let delay = 20_u64.saturating_sub(package.name().len() as u64);
        std::thread::sleep(Duration::from_millis(delay));

        if package.name().starts_with("broken-") {
            return Err(CheckError::CheckFailed {
                check: "echo".to_owned(),
                reason: package.name().to_owned(),
            });
        }

        let mut messages = vec![fail_message(package.name())];
        if package.name().contains("twice") {
            messages.push(fail_message(format_args!("{} again", package.name())));
        }
        Ok(messages)
    }
}

fn packages(names: &[&str]) -> Vec<PackageView> {
    names
        .iter()
        .map(|&name| PackageView::source(format!("/srv/{name}.src.tar"), name, "noarch"))
        .collect()
}

fn context(universe: Vec<PackageView>) -> RunContext {
    RunContext::new(Arc::new(Bindings::new()), RegistryDirs::default(), universe)
}

fn run(check: Elementwise<Echo>, names: &[&str]) -> Result<CheckResult> {
    let ctx = context(packages(names));
    let Configuration::Ready(configured) = configure(check, &ctx) else {
        panic!("NoConfig checks always configure");
    };
    configured.run(ctx.universe().iter().cloned())
}

fn workers(count: usize) -> NonZeroUsize {
    NonZeroUsize::new(count).expect("non-zero worker count")
}

#[rstest]
#[case::sequential(1)]
#[case::parallel(4)]
#[case::more_workers_than_items(64)]
fn messages_are_concatenated_in_input_order(#[case] count: usize) {
    let names = ["a", "bb", "c-twice", "dddd", "e", "ffffff", "g", "hh"];

    let result = run(Elementwise::new(Echo).with_workers(workers(count)), &names)
        .expect("run should succeed");

    let expected: Vec<String> = names
        .iter()
        .flat_map(|name| {
            let mut expected = vec![format!("[FAIL] {name}")];
            if name.contains("twice") {
                expected.push(format!("[FAIL] {name} again"));
            }
            expected
        })
        .collect();
    assert_eq!(result.into_messages(), expected);
}

#[test]
fn filtered_out_packages_contribute_nothing() {
    let check = Elementwise::new(Echo)
        .with_workers(workers(3))
        .with_filter(|package| package.name() != "skip-me");

    let result = run(check, &["a", "skip-me", "b"]).expect("run should succeed");

    assert_eq!(result.messages(), ["[FAIL] a", "[FAIL] b"]);
}

#[test]
fn filter_runs_before_evaluation() {
    let check =
        Elementwise::new(Echo).with_filter(|package| !package.name().starts_with("broken-"));

    let result = run(check, &["broken-one", "fine"]).expect("broken package is filtered");

    assert_eq!(result.messages(), ["[FAIL] fine"]);
}

#[rstest]
#[case::sequential(1)]
#[case::parallel(4)]
fn first_error_in_input_order_aborts_the_run(#[case] count: usize) {
    let names = ["a", "broken-first", "b", "c", "d", "broken-second", "e", "f"];

    let err = run(Elementwise::new(Echo).with_workers(workers(count)), &names)
        .expect_err("broken package should abort");

    assert!(matches!(
        err,
        CheckError::CheckFailed { ref reason, .. } if reason == "broken-first"
    ));
}

#[test]
fn empty_input_passes() {
    let result = run(Elementwise::new(Echo), &[]).expect("run should succeed");

    assert!(result.is_passed());
}

#[test]
fn check_name_comes_from_the_rule() {
    let check = Elementwise::new(Echo);

    assert_eq!(Check::name(&check), "echo");
    let any = PackageView::source("/srv/x.src.tar", "x", "noarch");
    assert!(check.accepts(&any));
}
