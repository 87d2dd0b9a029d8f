//! `assayer` command-line entrypoint running every bundled check.

use std::io;

use assayer::{Invocation, main_with};
use assayer_suite::suite_checks;
use clap::Parser;

fn main() {
    let invocation = Invocation::parse();
    let exit_code = main_with(
        &invocation,
        suite_checks(),
        &mut io::stdout().lock(),
        &mut io::stderr(),
    );
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
