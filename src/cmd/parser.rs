/*!
Parser front-end on top of clap.

clap does the matching; this module adds what the `harbor` CLI needs around
it:
  - `build_arg`: turn an `ArgDecl` into a clap `Arg`, rejecting bad option
    combinations as `SpecError`
  - `resolve_option_prefixes`: expand abbreviated `--long` flags, treating
    `--page-size` / `--page_size` style spellings as one candidate
  - `parse` / `parse_known`: full and known-args parsing
  - `ParseFailure`: argparse-style error text (usage, first clause of the
    message, `Try 'harbor help <cmd>'` hint), exit status 2
*/

use clap::builder::PossibleValuesParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::cmd::args::{Action, ArgDecl, Help, Nargs, ValueKind};
use crate::cmd::format;

/// Exit status for any command-line parse error.
pub const PARSE_ERROR_STATUS: i32 = 2;

/// Marks the start of a choice enumeration inside an error message.
const CHOICE_LIST_MARKER: &str = " (choose from";

/// A declaration that cannot become a parser argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("invalid argument {arg} for '{command}': {reason}")]
    Invalid {
        command: String,
        arg: String,
        reason: String,
    },
    #[error("conflicting option string {option} for '{command}'")]
    Conflict { command: String, option: String },
}

/// Parse error, rendered the way it is shown to the user.
#[derive(Debug, Error)]
#[error("{usage}error: {message}\nTry '{program} help {subcommand}' for more information.\n")]
pub struct ParseFailure {
    usage: String,
    program: String,
    subcommand: String,
    message: String,
}

impl ParseFailure {
    /// `prog` is the parser's program name, e.g. `harbor` or `harbor job-list`.
    pub fn new(prog: &str, usage: String, message: &str) -> Self {
        let (program, subcommand) = prog.split_once(' ').unwrap_or((prog, ""));
        Self {
            usage,
            program: program.to_string(),
            subcommand: subcommand.to_string(),
            message: first_clause(message).to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn subcommand(&self) -> &str {
        &self.subcommand
    }

    pub fn exit_code(&self) -> i32 {
        PARSE_ERROR_STATUS
    }
}

/// Cut an error message before any `(choose from ...)` enumeration.
pub fn first_clause(message: &str) -> &str {
    message
        .split(CHOICE_LIST_MARKER)
        .next()
        .unwrap_or(message)
}

/* -------------------------------------------------------------------------- */
/* Argument construction                                                      */
/* -------------------------------------------------------------------------- */

/// Build the clap argument for one declaration, verbatim.
pub fn build_arg(command: &str, decl: &ArgDecl) -> Result<Arg, SpecError> {
    let invalid = |reason: &str| SpecError::Invalid {
        command: command.to_string(),
        arg: format!("{:?}", decl.names),
        reason: reason.to_string(),
    };

    let id = decl.dest_name();
    if decl.names.is_empty() || id.is_empty() {
        return Err(invalid("no option strings"));
    }

    let mut arg = Arg::new(id).value_name(decl.display_metavar());

    if decl.is_positional() {
        if decl.required {
            return Err(invalid("'required' is an invalid option for positionals"));
        }
        if !decl.action.takes_value() {
            return Err(invalid("positionals must store a value"));
        }
        let required = matches!(decl.nargs, Nargs::One | Nargs::OneOrMore | Nargs::Exactly(_));
        arg = arg.required(required && decl.default.is_none());
    } else {
        let mut longs = Vec::new();
        let mut shorts = Vec::new();
        for name in &decl.names {
            if let Some(long) = name.strip_prefix("--") {
                if long.is_empty() || long.starts_with('-') {
                    return Err(invalid("malformed long option"));
                }
                longs.push(long.to_string());
            } else if let Some(short) = name.strip_prefix('-') {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c != '-' => shorts.push(c),
                    _ => return Err(invalid("short options take a single character")),
                }
            } else {
                return Err(invalid("positional and option strings cannot be mixed"));
            }
        }
        if let Some((first, rest)) = longs.split_first() {
            arg = arg.long(first.clone()).aliases(rest.to_vec());
        }
        if let Some((first, rest)) = shorts.split_first() {
            arg = arg.short(*first).short_aliases(rest.to_vec());
        }
        arg = arg.required(decl.required);
    }

    arg = arg.action(match decl.action {
        Action::Store => ArgAction::Set,
        Action::Append => ArgAction::Append,
        Action::StoreTrue => ArgAction::SetTrue,
        Action::StoreFalse => ArgAction::SetFalse,
        Action::Count => ArgAction::Count,
    });

    if decl.action.takes_value() {
        let range = match (decl.nargs, decl.is_positional()) {
            (Nargs::One | Nargs::Optional, true) => (1, Some(1)),
            (Nargs::ZeroOrMore | Nargs::OneOrMore, true) => (1, None),
            (Nargs::One, false) => (1, Some(1)),
            (Nargs::Optional, false) => (0, Some(1)),
            (Nargs::ZeroOrMore, false) => (0, None),
            (Nargs::OneOrMore, false) => (1, None),
            (Nargs::Exactly(0), _) => return Err(invalid("nargs must be at least 1")),
            (Nargs::Exactly(n), _) => (n, Some(n)),
        };
        arg = match range {
            (min, Some(max)) => arg.num_args(min..=max),
            (min, None) => arg.num_args(min..),
        };
    } else if decl.nargs != Nargs::One
        || !decl.choices.is_empty()
        || decl.kind != ValueKind::Str
        || decl.default.is_some()
    {
        return Err(invalid("flag actions take no value options"));
    }

    match (decl.kind, decl.choices.is_empty()) {
        (ValueKind::Int, false) => {
            return Err(invalid("choices are only supported for string values"));
        }
        (ValueKind::Int, true) => arg = arg.value_parser(clap::value_parser!(i64)),
        (ValueKind::Str, false) => {
            arg = arg.value_parser(PossibleValuesParser::new(decl.choices.clone()));
        }
        (ValueKind::Str, true) => {}
    }

    if let Some(default) = &decl.default {
        arg = arg.default_value(default.clone());
    }

    match &decl.help {
        Help::Text(text) => arg = arg.help(text.clone()),
        Help::Suppressed => arg = arg.hide(true),
        Help::None => {}
    }
    Ok(arg)
}

/// Hidden `-h/--help` flag re-added to every sub-parser.
pub fn help_flag() -> Arg {
    Arg::new("help")
        .short('h')
        .long("help")
        .action(ArgAction::SetTrue)
        .hide(true)
}

/// Every spelling of an option: short, short aliases, long, long aliases.
pub fn option_strings(arg: &Arg) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(short) = arg.get_short() {
        out.push(format!("-{short}"));
    }
    for short in arg.get_all_short_aliases().unwrap_or_default() {
        out.push(format!("-{short}"));
    }
    if let Some(long) = arg.get_long() {
        out.push(format!("--{long}"));
    }
    for long in arg.get_all_aliases().unwrap_or_default() {
        out.push(format!("--{long}"));
    }
    out
}

/* -------------------------------------------------------------------------- */
/* Option prefix matching                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Debug, PartialEq, Eq)]
enum OptionMatch<'a> {
    Found(&'a Arg, String),
    Ambiguous(Vec<String>),
    NoMatch,
}

fn normalize(option: &str) -> String {
    option.replace('_', "-")
}

/// Match a `--long` token (without `=value`) against the options in scope.
fn match_long<'a>(scope: &[&'a Arg], flag: &str) -> OptionMatch<'a> {
    let mut candidates: Vec<(&'a Arg, String)> = Vec::new();
    for arg in scope {
        for option in option_strings(arg).into_iter().filter(|o| o.starts_with("--")) {
            if option == flag {
                return OptionMatch::Found(arg, option);
            }
            if option.starts_with(flag) {
                candidates.push((arg, option));
            }
        }
    }
    match candidates.len() {
        0 => OptionMatch::NoMatch,
        1 => {
            let (arg, option) = candidates.remove(0);
            OptionMatch::Found(arg, option)
        }
        _ => {
            let first = normalize(&candidates[0].1);
            if candidates.iter().all(|(_, o)| normalize(o) == first) {
                let (arg, option) = candidates.remove(0);
                OptionMatch::Found(arg, option)
            } else {
                OptionMatch::Ambiguous(candidates.into_iter().map(|(_, o)| o).collect())
            }
        }
    }
}

fn match_short<'a>(scope: &[&'a Arg], token: &str) -> Option<&'a Arg> {
    let mut chars = token.strip_prefix('-')?.chars();
    let c = chars.next()?;
    scope.iter().copied().find(|arg| {
        arg.get_short() == Some(c) || arg.get_all_short_aliases().unwrap_or_default().contains(&c)
    })
}

fn ambiguous(prog: &str, cmd: &Command, flag: &str, candidates: &[String]) -> ParseFailure {
    ParseFailure::new(
        prog,
        format::render_usage(prog, cmd),
        &format!(
            "ambiguous option: {flag} could match {}",
            candidates.join(", ")
        ),
    )
}

/// argv with abbreviated long options expanded, plus the subcommand it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub args: Vec<String>,
    /// Tokens that are neither options nor option values.
    pub positionals: Vec<String>,
    pub subcommand: Option<String>,
}

/// Expand unambiguous `--long` prefixes against the root options, and after
/// the subcommand token, against that subcommand's options plus the global
/// ones. Unknown options pass through untouched for clap to report.
pub fn resolve_option_prefixes(root: &Command, argv: &[String]) -> Result<Resolved, ParseFailure> {
    let globals: Vec<&Arg> = root.get_arguments().filter(|a| a.is_global_set()).collect();
    let mut scope: Vec<&Arg> = root.get_arguments().collect();
    let mut current = root;
    let mut prog = root.get_name().to_string();
    let mut subcommand = None;
    let mut positionals = Vec::new();
    let mut out = Vec::with_capacity(argv.len());

    let mut tokens = argv.iter();
    while let Some(token) = tokens.next() {
        if token == "--" {
            out.push(token.clone());
            out.extend(tokens.by_ref().cloned());
            break;
        }
        if token.len() > 2 && token.starts_with("--") {
            let (flag, inline) = match token.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (token.as_str(), None),
            };
            match match_long(&scope, flag) {
                OptionMatch::Found(arg, full) => {
                    match inline {
                        Some(value) => out.push(format!("{full}={value}")),
                        None => out.push(full),
                    }
                    if inline.is_none() && arg.get_action().takes_values() {
                        if let Some(value) = tokens.next() {
                            out.push(value.clone());
                        }
                    }
                    continue;
                }
                OptionMatch::Ambiguous(candidates) => {
                    return Err(ambiguous(&prog, current, flag, &candidates));
                }
                OptionMatch::NoMatch => {}
            }
        } else if token.len() == 2 && token.starts_with('-') {
            if let Some(arg) = match_short(&scope, token) {
                out.push(token.clone());
                if arg.get_action().takes_values() {
                    if let Some(value) = tokens.next() {
                        out.push(value.clone());
                    }
                }
                continue;
            }
        } else if !token.starts_with('-') {
            positionals.push(token.clone());
            if subcommand.is_none() {
                if let Some(sub) = root.find_subcommand(token) {
                    prog = format!("{} {}", root.get_name(), sub.get_name());
                    subcommand = Some(sub.get_name().to_string());
                    scope = sub.get_arguments().chain(globals.iter().copied()).collect();
                    current = sub;
                }
            }
        }
        out.push(token.clone());
    }

    Ok(Resolved {
        args: out,
        positionals,
        subcommand,
    })
}

/* -------------------------------------------------------------------------- */
/* Parsing                                                                    */
/* -------------------------------------------------------------------------- */

/// Parse `argv` (program name excluded) against the full command tree.
pub fn parse(root: &Command, argv: &[String]) -> Result<ArgMatches, ParseFailure> {
    let resolved = resolve_option_prefixes(root, argv)?;
    let name = root.get_name().to_string();
    root.clone()
        .try_get_matches_from(std::iter::once(name.clone()).chain(resolved.args))
        .map_err(|err| {
            let sub = resolved
                .subcommand
                .as_deref()
                .and_then(|s| root.find_subcommand(s));
            let (prog, parser) = match sub {
                Some(sub) => (format!("{name} {}", sub.get_name()), sub),
                None => (name.clone(), root),
            };
            ParseFailure::new(&prog, format::render_usage(&prog, parser), &describe(&err, root, parser))
        })
}

/// Parse only the options `cmd` knows about, skipping every other token.
pub fn parse_known(cmd: &Command, argv: &[String]) -> Result<ArgMatches, ParseFailure> {
    let name = cmd.get_name().to_string();
    let scope: Vec<&Arg> = cmd.get_arguments().collect();
    let mut known = Vec::new();

    let mut tokens = argv.iter();
    while let Some(token) = tokens.next() {
        if token == "--" {
            break;
        }
        let arg = if token.len() > 2 && token.starts_with("--") {
            let (flag, inline) = match token.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (token.as_str(), None),
            };
            match match_long(&scope, flag) {
                OptionMatch::Found(arg, full) => {
                    match inline {
                        Some(value) => {
                            known.push(format!("{full}={value}"));
                            continue;
                        }
                        None => known.push(full),
                    }
                    arg
                }
                OptionMatch::Ambiguous(candidates) => {
                    return Err(ambiguous(&name, cmd, flag, &candidates));
                }
                OptionMatch::NoMatch => continue,
            }
        } else if token.len() == 2 && token.starts_with('-') {
            match match_short(&scope, token) {
                Some(arg) => {
                    known.push(token.clone());
                    arg
                }
                None => continue,
            }
        } else {
            continue;
        };
        if arg.get_action().takes_values() {
            if let Some(value) = tokens.next() {
                known.push(value.clone());
            }
        }
    }

    cmd.clone()
        .try_get_matches_from(std::iter::once(name.clone()).chain(known))
        .map_err(|err| ParseFailure::new(&name, format::render_usage(&name, cmd), &describe(&err, cmd, cmd)))
}

fn context_text(value: &ContextValue) -> String {
    match value {
        ContextValue::String(s) => s.clone(),
        ContextValue::Strings(v) => v.join(", "),
        ContextValue::StyledStr(s) => s.to_string(),
        ContextValue::StyledStrs(v) => v
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        ContextValue::Number(n) => n.to_string(),
        ContextValue::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn quoted_list<I: IntoIterator<Item = String>>(items: I) -> String {
    items
        .into_iter()
        .map(|i| format!("'{i}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_brackets(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '<' | '>' | '[' | ']' | '.')).collect()
}

/// Name an argument the way argparse does: first option string for flags,
/// metavar for positionals. `rendered` is clap's own rendering, e.g.
/// `--status <<status>>` or `<<policy_id>>`.
fn arg_label(rendered: &str, scope: &[&Arg]) -> String {
    let rendered = rendered.trim();
    let head = rendered.split([' ', '=']).next().unwrap_or(rendered);
    let found = if head.starts_with('-') {
        scope
            .iter()
            .find(|arg| option_strings(arg).iter().any(|o| o == head))
    } else {
        let bare = strip_brackets(rendered);
        scope.iter().filter(|arg| arg.is_positional()).find(|arg| {
            let value_name = arg
                .get_value_names()
                .and_then(|names| names.first())
                .map(|name| strip_brackets(name.as_str()));
            value_name.as_deref() == Some(bare.as_str()) || arg.get_id().as_str() == bare
        })
    };
    match found {
        Some(arg) if arg.is_positional() => arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|name| name.to_string())
            .unwrap_or_else(|| arg.get_id().to_string()),
        Some(arg) => option_strings(arg)
            .into_iter()
            .next()
            .unwrap_or_else(|| rendered.to_string()),
        None => rendered.to_string(),
    }
}

fn arg_labels(value: Option<&ContextValue>, scope: &[&Arg]) -> String {
    let rendered: Vec<String> = match value {
        Some(ContextValue::Strings(v)) => v.clone(),
        Some(other) => vec![context_text(other)],
        None => Vec::new(),
    };
    rendered
        .iter()
        .map(|r| arg_label(r, scope))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Phrase a clap error the way argparse would. `active` is the parser the
/// error came from; global options of `root` are in scope too.
fn describe(err: &clap::Error, root: &Command, active: &Command) -> String {
    let context = |kind| err.get(kind).map(context_text).unwrap_or_default();
    let scope: Vec<&Arg> = active
        .get_arguments()
        .chain(root.get_arguments().filter(|a| a.is_global_set()))
        .collect();
    let arg = arg_labels(err.get(ContextKind::InvalidArg), &scope);
    let value = context(ContextKind::InvalidValue);

    match err.kind() {
        ErrorKind::InvalidValue if value.is_empty() => {
            format!("argument {arg}: expected a value")
        }
        ErrorKind::InvalidValue => {
            let valid = match err.get(ContextKind::ValidValue) {
                Some(ContextValue::Strings(v)) => v.clone(),
                _ => Vec::new(),
            };
            format!(
                "argument {arg}: invalid choice: '{value}'{CHOICE_LIST_MARKER} {})",
                quoted_list(valid)
            )
        }
        ErrorKind::ValueValidation => format!("argument {arg}: invalid int value: '{value}'"),
        ErrorKind::UnknownArgument => {
            format!("unrecognized arguments: {}", context(ContextKind::InvalidArg))
        }
        ErrorKind::InvalidSubcommand => {
            let names = root
                .get_subcommands()
                .filter(|s| !s.is_hide_set())
                .map(|s| s.get_name().to_string());
            format!(
                "argument {}: invalid choice: '{}'{CHOICE_LIST_MARKER} {})",
                format::SUBCOMMAND_METAVAR,
                context(ContextKind::InvalidSubcommand),
                quoted_list(names)
            )
        }
        ErrorKind::MissingRequiredArgument => {
            format!("the following arguments are required: {arg}")
        }
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            format!(
                "the following arguments are required: {}",
                format::SUBCOMMAND_METAVAR
            )
        }
        _ => {
            let rendered = err.render().to_string();
            let line = rendered.lines().next().unwrap_or_default();
            line.strip_prefix("error: ").unwrap_or(line).to_string()
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Parsed arguments                                                           */
/* -------------------------------------------------------------------------- */

/// Values a handler receives, keyed by each declaration's dest name.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    command: String,
    matches: ArgMatches,
}

impl ParsedArgs {
    pub fn new(command: impl Into<String>, matches: ArgMatches) -> Self {
        Self {
            command: command.into(),
            matches,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    pub fn values(&self, id: &str) -> Vec<&str> {
        self.matches
            .try_get_many::<String>(id)
            .ok()
            .flatten()
            .map(|vals| vals.map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn int(&self, id: &str) -> Option<i64> {
        self.matches.try_get_one::<i64>(id).ok().flatten().copied()
    }

    pub fn flag(&self, id: &str) -> bool {
        self.matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    pub fn count(&self, id: &str) -> u8 {
        self.matches
            .try_get_one::<u8>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn job_cmd() -> Command {
        let decls = [
            ArgDecl::new(["policy_id"]).metavar("<policy_id>"),
            ArgDecl::new(["--job-id", "--job_id"]).metavar("<job_id>"),
            ArgDecl::new(["--status"])
                .metavar("<status>")
                .choices(["running", "finished"]),
            ArgDecl::new(["--page"]).metavar("<page>").kind(ValueKind::Int),
            ArgDecl::new(["--page-size"]).metavar("<page_size>"),
        ];
        let mut cmd = Command::new("job-list").disable_help_flag(true).arg(help_flag());
        for decl in &decls {
            cmd = cmd.arg(build_arg("job-list", decl).unwrap());
        }
        cmd
    }

    fn root() -> Command {
        Command::new("harbor")
            .disable_help_flag(true)
            .disable_version_flag(true)
            .disable_help_subcommand(true)
            .color(clap::ColorChoice::Never)
            .arg(Arg::new("debug").long("debug").action(ArgAction::SetTrue).global(true))
            .subcommand(job_cmd())
    }

    #[test]
    fn spelling_variants_resolve_to_first() {
        let resolved = resolve_option_prefixes(&root(), &argv(&["job-list", "--job", "7", "1"])).unwrap();
        assert_eq!(resolved.args, argv(&["job-list", "--job-id", "7", "1"]));
        assert_eq!(resolved.positionals, argv(&["job-list", "1"]));
        assert_eq!(resolved.subcommand.as_deref(), Some("job-list"));

        let matches = parse(&root(), &argv(&["job-list", "--job", "7", "1"])).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let parsed = ParsedArgs::new(name, sub.clone());
        assert_eq!(parsed.value("job_id"), Some("7"));
        assert_eq!(parsed.value("policy_id"), Some("1"));
    }

    #[test]
    fn genuinely_ambiguous_prefix_fails() {
        let err = parse(&root(), &argv(&["job-list", "--pa", "2", "1"])).unwrap_err();
        assert_eq!(
            err.message(),
            "ambiguous option: --pa could match --page, --page-size"
        );
        assert_eq!(err.subcommand(), "job-list");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn prefix_with_inline_value_and_exact_match() {
        let resolved =
            resolve_option_prefixes(&root(), &argv(&["job-list", "--stat=running", "--page", "3"]))
                .unwrap();
        assert_eq!(
            resolved.args,
            argv(&["job-list", "--status=running", "--page", "3"])
        );
    }

    #[test]
    fn global_options_resolve_inside_subcommand() {
        let resolved = resolve_option_prefixes(&root(), &argv(&["job-list", "1", "--deb"])).unwrap();
        assert_eq!(resolved.args, argv(&["job-list", "1", "--debug"]));
    }

    #[test]
    fn invalid_choice_hides_enumeration() {
        let err = parse(&root(), &argv(&["job-list", "--status", "bogus", "1"])).unwrap_err();
        assert_eq!(err.message(), "argument --status: invalid choice: 'bogus'");
        assert_eq!(err.exit_code(), PARSE_ERROR_STATUS);

        let rendered = err.to_string();
        assert!(rendered.starts_with("usage: harbor job-list"));
        assert!(rendered.ends_with(
            "Try 'harbor help job-list' for more information.\n"
        ));
        assert!(!rendered.contains("finished"));
    }

    #[test]
    fn invalid_int_and_missing_positional() {
        let err = parse(&root(), &argv(&["job-list", "--page", "x", "1"])).unwrap_err();
        assert_eq!(err.message(), "argument --page: invalid int value: 'x'");

        let err = parse(&root(), &argv(&["job-list"])).unwrap_err();
        assert_eq!(err.message(), "the following arguments are required: <policy_id>");
        assert!(err.to_string().contains("error: the following arguments are required: <policy_id>\n"));
    }

    #[test]
    fn plain_positional_is_named_by_its_metavar() {
        let cmd = Command::new("job-log")
            .disable_help_flag(true)
            .arg(build_arg("job-log", &ArgDecl::new(["job_id"]).kind(ValueKind::Int)).unwrap());
        let root = Command::new("harbor").subcommand(cmd);
        let err = parse(&root, &argv(&["job-log"])).unwrap_err();
        assert_eq!(err.message(), "the following arguments are required: job_id");
        let err = parse(&root, &argv(&["job-log", "abc"])).unwrap_err();
        assert_eq!(err.message(), "argument job_id: invalid int value: 'abc'");
    }

    #[test]
    fn global_option_errors_name_the_flag() {
        let root = Command::new("harbor")
            .disable_help_flag(true)
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .value_name("<seconds>")
                    .value_parser(clap::value_parser!(u64))
                    .global(true),
            )
            .subcommand(job_cmd());
        let err = parse(&root, &argv(&["job-list", "1", "--timeout", "soon"])).unwrap_err();
        assert_eq!(err.message(), "argument --timeout: invalid int value: 'soon'");
    }

    #[test]
    fn unknown_flag_is_reported_verbatim() {
        let err = parse(&root(), &argv(&["job-list", "1", "--bogus"])).unwrap_err();
        assert_eq!(err.message(), "unrecognized arguments: --bogus");
    }

    #[test]
    fn declaration_actions_reach_parsed_args() {
        let decls = [
            ArgDecl::new(["--tag", "-t"]).action(Action::Append).dest("tags"),
            ArgDecl::new(["-v"]).action(Action::Count),
            ArgDecl::new(["--no-verify"]).action(Action::StoreFalse).dest("verify"),
            ArgDecl::new(["--force"]).action(Action::StoreTrue),
            ArgDecl::new(["--token"]).suppress_help(),
            ArgDecl::new(["--limit"]).kind(ValueKind::Int).default_value("10"),
            ArgDecl::new(["--label"]).required(),
            ArgDecl::new(["paths"]).nargs(Nargs::ZeroOrMore),
        ];
        let mut cmd = Command::new("push").disable_help_flag(true);
        for decl in &decls {
            cmd = cmd.arg(build_arg("push", decl).unwrap());
        }
        assert!(cmd.get_arguments().any(|a| a.get_id() == "token" && a.is_hide_set()));

        let root = Command::new("harbor").subcommand(cmd);
        let matches = parse(
            &root,
            &argv(&[
                "push", "-t", "a", "--tag", "b", "-v", "-v", "--no-verify", "--label", "x", "p1",
                "p2",
            ]),
        )
        .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let parsed = ParsedArgs::new(name, sub.clone());
        assert_eq!(parsed.command(), "push");
        assert_eq!(parsed.values("tags"), vec!["a", "b"]);
        assert_eq!(parsed.count("v"), 2);
        assert!(!parsed.flag("verify"));
        assert!(!parsed.flag("force"));
        assert_eq!(parsed.int("limit"), Some(10));
        assert_eq!(parsed.value("label"), Some("x"));
        assert_eq!(parsed.values("paths"), vec!["p1", "p2"]);

        let err = parse(&root, &argv(&["push"])).unwrap_err();
        assert_eq!(err.message(), "the following arguments are required: --label");
    }

    #[test]
    fn unknown_subcommand_is_parse_error() {
        let err = parse(&root(), &argv(&["nope"])).unwrap_err();
        assert!(err.message().contains("nope"), "{}", err.message());
        assert!(!err.message().contains("job-list"));
        assert_eq!(err.subcommand(), "");
    }

    #[test]
    fn first_clause_truncates_choice_list() {
        assert_eq!(
            first_clause("argument x: invalid choice: 'a' (choose from 'b', 'c')"),
            "argument x: invalid choice: 'a'"
        );
        assert_eq!(first_clause("plain message"), "plain message");
    }

    #[test]
    fn parse_known_ignores_foreign_tokens() {
        let base = Command::new("harbor")
            .disable_help_flag(true)
            .arg(Arg::new("debug").long("debug").action(ArgAction::SetTrue))
            .arg(Arg::new("harbor_url").long("harbor-url").action(ArgAction::Set))
            .arg(help_flag());
        let matches = parse_known(
            &base,
            &argv(&["job-list", "--status", "x", "--harbor-url", "http://h", "--deb", "-z"]),
        )
        .unwrap();
        assert!(matches.get_flag("debug"));
        assert!(!matches.get_flag("help"));
        assert_eq!(
            matches.get_one::<String>("harbor_url").map(String::as_str),
            Some("http://h")
        );
    }

    #[test]
    fn bad_declarations_are_rejected() {
        let cases = [
            ArgDecl::new(Vec::<String>::new()),
            ArgDecl::new(["id"]).required(),
            ArgDecl::new(["--verbose"]).action(Action::StoreTrue).choices(["a"]),
            ArgDecl::new(["--page"]).kind(ValueKind::Int).choices(["1"]),
            ArgDecl::new(["-ab"]),
            ArgDecl::new(["--x", "plain"]),
            ArgDecl::new(["--n"]).nargs(Nargs::Exactly(0)),
        ];
        for decl in cases {
            assert!(
                matches!(build_arg("t", &decl), Err(SpecError::Invalid { .. })),
                "expected rejection for {decl:?}"
            );
        }
    }

    #[test]
    fn option_strings_cover_aliases() {
        let arg = build_arg("t", &ArgDecl::new(["-s", "--page-size", "--page_size"])).unwrap();
        assert_eq!(option_strings(&arg), vec!["-s", "--page-size", "--page_size"]);
    }
}
