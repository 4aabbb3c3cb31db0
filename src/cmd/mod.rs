/*!
Command layer of the `harbor` CLI.

Layout:
  src/cmd/
    mod.rs       (this file: module table + entry point)
    args.rs      (ArgDecl / ArgSpec: argument declarations per handler)
    registry.rs  (CommandEntry tables -> sub-parsers, `command!` macro)
    parser.rs    (clap front-end: prefix matching, argparse-style errors)
    format.rs    (help pages + record tables)
    shell.rs     (global options, help / bash_completion / dispatch)
    jobs.rs      (job-list, job-log)

Conventions:
  - A command module exposes `pub const COMMANDS: &[CommandEntry]`; each
    handler is `fn do_<name>(&HarborClient, &ParsedArgs) -> anyhow::Result<()>`.
  - Adding a module means adding its table to `MODULES`. Order matters only
    for name collisions (the later table wins).
*/

pub mod args;
pub mod format;
pub mod jobs;
pub mod parser;
pub mod registry;
pub mod shell;

use std::io::{self, Write};

use anyhow::Result;

use crate::cmd::registry::CommandEntry;
use crate::utils;

pub use shell::{SUCCESS_STATUS, Shell, report};

/// Contributed command tables, in registration order.
pub const MODULES: &[&[CommandEntry]] = &[jobs::COMMANDS];

/// Run one invocation (`argv` without the program name). Installs the
/// process ctrl-c handler first, so call it once per process.
pub fn run(argv: &[String]) -> Result<()> {
    utils::interrupt::install()?;
    let mut out = io::stdout().lock();
    Shell::new(MODULES).main(argv, &mut out)?;
    out.flush()?;
    Ok(())
}
