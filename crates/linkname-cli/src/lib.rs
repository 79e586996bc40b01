//! Library interface for the linkname-gen command

pub mod args;

use args::Cli;
use linkname_core::{Generated, Generator, Result};

/// Run one generation for parsed arguments. `invocation` is the raw
/// argument list echoed into the generated file's header.
pub fn run(cli: &Cli, invocation: Vec<String>) -> Result<Generated> {
    let request = cli.request(invocation)?;
    Generator::new(cli.config()).run(&request)
}
