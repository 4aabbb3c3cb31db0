/*!
Top-level dispatcher for the `harbor` CLI.

`Shell::main` runs one invocation:

  1. known-args parse of the global options (`--debug` switches logging to
     DEBUG before anything else happens)
  2. registry build from the contributed command tables
  3. routing:
       - help: `-h/--help`, a literal `help` token, or no arguments at all
       - bash_completion: completion word list, no credentials needed
       - otherwise: full parse, connect, run the handler

Exit statuses are decided by `report`: 2 for parse errors, 130 for ctrl-c,
127 for everything else.
*/

use std::collections::BTreeSet;
use std::io::Write;

use anyhow::Result;
use clap::{ColorChoice, CommandFactory, FromArgMatches, Parser};
use thiserror::Error;

use crate::api::{ConnectOptions, HarborClient};
use crate::cmd::args::{ArgDecl, ArgSpec, Nargs};
use crate::cmd::format::{self, HelpDoc, HelpFormatter};
use crate::cmd::parser::{self, ParseFailure, ParsedArgs, SpecError};
use crate::cmd::registry::{BASH_COMPLETION, CommandEntry, Handler, Registry};
use crate::utils::interrupt::{Interrupted, TERMINATING_NOTICE};
use crate::utils::logging;

pub const SUCCESS_STATUS: i32 = 0;
pub const COMMAND_ERROR_STATUS: i32 = 127;
pub const INTERRUPTED_STATUS: i32 = 130;

const HELP_COMMAND: &str = "help";

/// Command-line interface to the Harbor API.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "harbor",
    after_help = "See \"harbor help COMMAND\" for help on a specific command.",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true,
    color = ColorChoice::Never
)]
pub struct GlobalOptions {
    #[arg(short = 'h', long = "help", hide = true)]
    pub help: bool,

    /// Print debugging output.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Harbor URL. Defaults to env[HARBOR_URL].
    #[arg(long = "harbor-url", value_name = "<url>", global = true)]
    pub harbor_url: Option<String>,

    /// Username to authenticate with. Defaults to env[HARBOR_USERNAME].
    #[arg(long, value_name = "<username>", global = true)]
    pub username: Option<String>,

    /// Password to authenticate with. Defaults to env[HARBOR_PASSWORD].
    #[arg(long, value_name = "<password>", global = true)]
    pub password: Option<String>,

    /// Request timeout in seconds. Defaults to env[HARBOR_TIMEOUT] or 30.
    #[arg(long, value_name = "<seconds>", global = true)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification.
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl From<&GlobalOptions> for ConnectOptions {
    fn from(globals: &GlobalOptions) -> Self {
        ConnectOptions {
            url: globals.harbor_url.clone(),
            username: globals.username.clone(),
            password: globals.password.clone(),
            timeout: globals.timeout,
            insecure: globals.insecure,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("'{0}' is not a valid subcommand")]
    UnknownSubcommand(String),
}

fn help_args() -> ArgSpec {
    ArgSpec::from_decls([ArgDecl::new(["command"])
        .metavar("<subcommand>")
        .nargs(Nargs::Optional)
        .help("Display help for <subcommand>.")])
}

/// Commands the shell contributes itself, registered after every module.
pub const SHELL_COMMANDS: &[CommandEntry] = &[CommandEntry {
    handler_name: "do_help",
    doc: "Display help about this program or one of its subcommands.",
    arguments: help_args,
    handler: Handler::Help,
}];

/// Parser for the global options alone.
pub fn base_parser() -> clap::Command {
    GlobalOptions::command()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Help(Option<String>),
    BashCompletion,
    Dispatch,
}

pub struct Shell {
    modules: Vec<&'static [CommandEntry]>,
}

impl Shell {
    pub fn new(modules: &[&'static [CommandEntry]]) -> Self {
        Self {
            modules: modules.to_vec(),
        }
    }

    pub fn build_registry(&self) -> Result<Registry, SpecError> {
        Registry::build(
            base_parser().subcommand_required(true),
            &self.modules,
            SHELL_COMMANDS,
        )
    }

    /// Run one invocation. `argv` excludes the program name; help and
    /// completion output goes to `out`.
    pub fn main(&self, argv: &[String], out: &mut dyn Write) -> Result<()> {
        let matches = parser::parse_known(&base_parser(), argv)?;
        let globals = GlobalOptions::from_arg_matches(&matches)?;
        logging::init_logging(logging::derive_level(globals.debug));

        let registry = self.build_registry()?;
        match route(&registry, &globals, argv)? {
            Route::Help(topic) => do_help(&registry, topic.as_deref(), out),
            Route::BashCompletion => do_bash_completion(&registry, out),
            Route::Dispatch => dispatch(&registry, &globals, argv, out),
        }
    }
}

fn route(registry: &Registry, globals: &GlobalOptions, argv: &[String]) -> Result<Route> {
    let resolved = parser::resolve_option_prefixes(registry.root(), argv)?;
    let help_token = argv
        .iter()
        .any(|a| matches!(a.as_str(), "help" | "-h" | "--help"));

    if globals.help || argv.is_empty() || help_token {
        let mut positionals = resolved.positionals.into_iter();
        let topic = match positionals.next() {
            Some(first) if first == HELP_COMMAND => {
                let topic = positionals.next();
                let extra: Vec<String> = positionals.collect();
                if !extra.is_empty() {
                    return Err(unrecognized_after_help(registry, &extra).into());
                }
                topic
            }
            // A help toggle next to something that is not a subcommand
            // falls back to the top-level page.
            Some(first) => registry.lookup(&first).map(|_| first),
            None => None,
        };
        return Ok(Route::Help(topic));
    }
    if resolved.subcommand.as_deref() == Some(BASH_COMPLETION) {
        return Ok(Route::BashCompletion);
    }
    Ok(Route::Dispatch)
}

fn unrecognized_after_help(registry: &Registry, extra: &[String]) -> ParseFailure {
    let prog = format!("{} {HELP_COMMAND}", registry.root().get_name());
    let usage = registry
        .lookup(HELP_COMMAND)
        .map(|sub| format::render_usage(&prog, &sub.parser))
        .unwrap_or_default();
    ParseFailure::new(
        &prog,
        usage,
        &format!("unrecognized arguments: {}", extra.join(" ")),
    )
}

fn dispatch(
    registry: &Registry,
    globals: &GlobalOptions,
    argv: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let matches = parser::parse(registry.root(), argv)?;
    let Some((name, sub_matches)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };
    let subcommand = registry
        .lookup(name)
        .ok_or_else(|| ShellError::UnknownSubcommand(name.to_string()))?;
    let args = ParsedArgs::new(name, sub_matches.clone());

    if args.flag("help") {
        return do_help(registry, Some(name), out);
    }

    match subcommand.descriptor.handler {
        Handler::Module(handler) => {
            let client = HarborClient::connect(ConnectOptions::from(globals))?;
            tracing::debug!(command = args.command(), "dispatching");
            handler(&client, &args)
        }
        Handler::Help => do_help(registry, args.value("command"), out),
        Handler::BashCompletion => do_bash_completion(registry, out),
    }
}

/// Print top-level help, or the help of one subcommand.
pub fn do_help(registry: &Registry, topic: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let root = registry.root();
    let doc = match topic {
        None => HelpDoc::from_command(root.get_name(), root),
        Some(name) => {
            let sub = registry
                .lookup(name)
                .ok_or_else(|| ShellError::UnknownSubcommand(name.to_string()))?;
            HelpDoc::from_command(&format!("{} {name}", root.get_name()), &sub.parser)
        }
    };
    write!(out, "{}", HelpFormatter::default().render(&doc))?;
    Ok(())
}

/// Print every command name and option string on one line, so the
/// completion script does not hard-code them.
pub fn do_bash_completion(registry: &Registry, out: &mut dyn Write) -> Result<()> {
    let mut words: BTreeSet<String> = registry.names().map(str::to_string).collect();
    for sub in registry.subcommands() {
        for arg in sub.parser.get_arguments() {
            words.extend(parser::option_strings(arg));
        }
    }
    for arg in registry.root().get_arguments() {
        words.extend(parser::option_strings(arg));
    }
    writeln!(out, "{}", words.into_iter().collect::<Vec<_>>().join(" "))?;
    Ok(())
}

/// Exit status for a failed invocation.
pub fn exit_status(err: &anyhow::Error) -> i32 {
    if let Some(failure) = err.downcast_ref::<ParseFailure>() {
        failure.exit_code()
    } else if err.downcast_ref::<Interrupted>().is_some() {
        INTERRUPTED_STATUS
    } else {
        COMMAND_ERROR_STATUS
    }
}

/// Write the user-facing report for a failed invocation and return its
/// exit status.
pub fn report(err: &anyhow::Error, out: &mut dyn Write, err_out: &mut dyn Write) -> i32 {
    let status = exit_status(err);
    let written = match status {
        parser::PARSE_ERROR_STATUS => write!(err_out, "{err}"),
        INTERRUPTED_STATUS => writeln!(err_out, "{TERMINATING_NOTICE}"),
        _ => writeln!(out, "CommandError: {err:#}"),
    };
    if let Err(io_err) = written.and_then(|()| out.flush()).and_then(|()| err_out.flush()) {
        tracing::debug!(%io_err, "failed to write error report");
    }
    status
}
