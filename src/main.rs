//! `harbor` - command-line client for the Harbor registry API.
//!
//!   harbor [--debug] [--harbor-url <url>] [--username <username>]
//!          [--password <password>] [--timeout <seconds>] [--insecure]
//!          <subcommand> ...
//!
//!   harbor help [<subcommand>]
//!   harbor job-list <policy_id> [--status <status>] ...
//!   harbor job-log <job_id>
//!
//! Exit status: 0 success, 2 usage error, 127 command error, 130 ctrl-c.

use std::io;

use harbor_cli::cmd;

fn main() {
    let argv: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let status = match cmd::run(&argv) {
        Ok(()) => cmd::SUCCESS_STATUS,
        Err(err) => cmd::report(&err, &mut io::stdout(), &mut io::stderr()),
    };
    std::process::exit(status);
}
