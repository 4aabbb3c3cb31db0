/*!
Subcommand registry.

Command modules expose a static `COMMANDS` table of `CommandEntry` values
(built with the `command!` macro). `Registry::build` walks those tables in
order, then the shell's own table, and builds one clap sub-parser per entry
whose handler identifier carries the `do_` prefix:

  do_job_list  ->  job-list
  do_job_log   ->  job-log

`bash_completion` is always registered last and hidden from help.

A name produced twice is overwritten by the later entry (it keeps the first
entry's listing position) and logged as a warning.
*/

use std::collections::HashSet;

use clap::Command;

use crate::api::HarborClient;
use crate::cmd::args::ArgSpec;
use crate::cmd::parser::{self, ParsedArgs, SpecError};

pub const HANDLER_PREFIX: &str = "do_";
pub const BASH_COMPLETION: &str = "bash_completion";

/// Handler contributed by a command module.
pub type HandlerFn = fn(&HarborClient, &ParsedArgs) -> anyhow::Result<()>;

/// What a subcommand runs.
#[derive(Clone, Copy, Debug)]
pub enum Handler {
    Module(HandlerFn),
    /// Shell built-in: help pages.
    Help,
    /// Shell built-in: completion word list.
    BashCompletion,
}

/// Static registration record: handler identifier, doc text, argument spec
/// builder and the handler itself.
#[derive(Clone, Copy, Debug)]
pub struct CommandEntry {
    pub handler_name: &'static str,
    pub doc: &'static str,
    pub arguments: fn() -> ArgSpec,
    pub handler: Handler,
}

/// Build a `CommandEntry` for a module handler, keeping its identifier.
///
/// ```ignore
/// pub const COMMANDS: &[CommandEntry] = &[
///     command!(do_job_log, job_log_args, "Get job logs."),
/// ];
/// ```
macro_rules! command {
    ($handler:ident, $arguments:expr, $doc:expr) => {
        $crate::cmd::registry::CommandEntry {
            handler_name: stringify!($handler),
            doc: $doc,
            arguments: $arguments,
            handler: $crate::cmd::registry::Handler::Module($handler),
        }
    };
}
pub(crate) use command;

/// Command name for a handler identifier: prefix stripped, `_` -> `-`.
pub fn command_name(handler_name: &str) -> Option<String> {
    handler_name
        .strip_prefix(HANDLER_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.replace('_', "-"))
}

#[derive(Clone, Debug)]
pub struct HandlerDescriptor {
    pub name: String,
    pub handler: Handler,
    /// First line of the doc text.
    pub help: String,
    /// Full doc text.
    pub description: String,
    pub arguments: ArgSpec,
}

impl HandlerDescriptor {
    fn new(name: String, entry: &CommandEntry) -> Self {
        let doc = entry.doc.trim();
        Self {
            name,
            handler: entry.handler,
            help: doc.lines().next().unwrap_or_default().trim().to_string(),
            description: doc.to_string(),
            arguments: (entry.arguments)(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Subcommand {
    pub descriptor: HandlerDescriptor,
    pub parser: Command,
}

/// Subcommand table plus the full parser built from it.
#[derive(Clone, Debug)]
pub struct Registry {
    root: Command,
    subcommands: Vec<Subcommand>,
}

impl Registry {
    /// Register every prefixed entry of `modules` (in order) and then of
    /// `shell`, attach the sub-parsers to `base`, and add `bash_completion`.
    pub fn build(
        base: Command,
        modules: &[&[CommandEntry]],
        shell: &[CommandEntry],
    ) -> Result<Self, SpecError> {
        let mut reserved: HashSet<String> = HashSet::new();
        for arg in base.get_arguments().filter(|a| a.is_global_set()) {
            reserved.insert(arg.get_id().to_string());
            reserved.extend(parser::option_strings(arg));
        }

        let mut subcommands: Vec<Subcommand> = Vec::new();
        for entry in modules.iter().flat_map(|m| m.iter()).chain(shell) {
            let Some(name) = command_name(entry.handler_name) else {
                tracing::debug!(handler = entry.handler_name, "skipping entry without handler prefix");
                continue;
            };
            let descriptor = HandlerDescriptor::new(name, entry);
            let parser = build_subparser(&descriptor, &reserved)?;
            insert(&mut subcommands, Subcommand { descriptor, parser });
        }

        let completion = HandlerDescriptor {
            name: BASH_COMPLETION.to_string(),
            handler: Handler::BashCompletion,
            help: String::new(),
            description: String::new(),
            arguments: ArgSpec::new(),
        };
        let parser = Command::new(BASH_COMPLETION)
            .disable_help_flag(true)
            .hide(true);
        insert(
            &mut subcommands,
            Subcommand {
                descriptor: completion,
                parser,
            },
        );

        let root = subcommands
            .iter()
            .fold(base, |root, sub| root.subcommand(sub.parser.clone()));
        tracing::debug!(count = subcommands.len(), "registered subcommands");
        Ok(Self { root, subcommands })
    }

    /// Full parser: global options plus every sub-parser.
    pub fn root(&self) -> &Command {
        &self.root
    }

    pub fn lookup(&self, name: &str) -> Option<&Subcommand> {
        self.subcommands.iter().find(|s| s.descriptor.name == name)
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &Subcommand> {
        self.subcommands.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subcommands.iter().map(|s| s.descriptor.name.as_str())
    }
}

fn insert(table: &mut Vec<Subcommand>, sub: Subcommand) {
    match table
        .iter_mut()
        .find(|s| s.descriptor.name == sub.descriptor.name)
    {
        Some(existing) => {
            tracing::warn!(
                command = %sub.descriptor.name,
                "command registered twice; the later handler replaces the earlier one"
            );
            *existing = sub;
        }
        None => table.push(sub),
    }
}

fn build_subparser(
    descriptor: &HandlerDescriptor,
    reserved: &HashSet<String>,
) -> Result<Command, SpecError> {
    let mut cmd = Command::new(descriptor.name.clone())
        .disable_help_flag(true)
        .arg(parser::help_flag());
    if !descriptor.help.is_empty() {
        cmd = cmd
            .about(descriptor.help.clone())
            .long_about(descriptor.description.clone());
    }

    let mut ids: HashSet<String> = HashSet::from(["help".to_string()]);
    let mut options: HashSet<String> = reserved.clone();
    options.extend(["-h".to_string(), "--help".to_string()]);

    let mut optional_positional: Option<String> = None;
    let mut variadic_positional: Option<String> = None;

    for decl in descriptor.arguments.iter() {
        let arg = parser::build_arg(&descriptor.name, decl)?;
        let id = arg.get_id().to_string();
        if arg.is_positional() {
            // clap assigns positionals by index: only the last may take
            // several values, and required ones cannot follow optional ones.
            let invalid = |reason: String| SpecError::Invalid {
                command: descriptor.name.clone(),
                arg: format!("{:?}", decl.names),
                reason,
            };
            if let Some(prev) = &variadic_positional {
                return Err(invalid(format!(
                    "positional follows '{prev}', which takes a variable number of values"
                )));
            }
            if arg.is_required_set() {
                if let Some(prev) = &optional_positional {
                    return Err(invalid(format!(
                        "required positional follows optional positional '{prev}'"
                    )));
                }
            } else {
                optional_positional = Some(id.clone());
            }
            if arg.get_num_args().is_some_and(|range| range.max_values() > 1) {
                variadic_positional = Some(id.clone());
            }
        }
        if reserved.contains(&id) || !ids.insert(id.clone()) {
            return Err(SpecError::Conflict {
                command: descriptor.name.clone(),
                option: id,
            });
        }
        for option in parser::option_strings(&arg) {
            if !options.insert(option.clone()) {
                return Err(SpecError::Conflict {
                    command: descriptor.name.clone(),
                    option,
                });
            }
        }
        cmd = cmd.arg(arg);
    }
    Ok(cmd)
}
