//! `javadoc_noarch` command-line entrypoint.

use std::io;

use assayer::{Invocation, main_with};
use clap::Parser;

fn main() {
    let invocation = Invocation::parse();
    let exit_code = main_with(
        &invocation,
        vec![Box::new(javadoc_noarch::check())],
        &mut io::stdout().lock(),
        &mut io::stderr(),
    );
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
