/*!
format.rs

Text layout for the `harbor` CLI: argparse-style help pages and the
bordered record tables printed by resource commands.

Help pages are rendered from clap `Command` metadata rather than by clap
itself, so top-level and subcommand help share one layout:

  usage: harbor job-list [--status <status>] <policy_id>

  List filters jobs according to the policy and repository.

  Positional arguments:
    <policy_id>          The policy id.

  Optional arguments:
    --status <status>    Filter by job status.

Layout rules:
  - headings keep their wording and only get the first character upper-cased
  - nesting indents by `INDENT_INCREMENT`
  - help text starts no further right than `MAX_HELP_POSITION`
  - everything wraps at `terminal_width()`

This module returns strings; callers decide where they are written.
*/

use clap::{Arg, Command};

pub const INDENT_INCREMENT: usize = 2;
pub const MAX_HELP_POSITION: usize = 32;

/// Width available for help text: `COLUMNS` (clamped) minus a margin of two.
pub fn terminal_width() -> usize {
    let columns = crate::utils::env(&["COLUMNS"], "")
        .trim()
        .parse::<usize>()
        .ok()
        .map(|w| w.clamp(40, 220))
        .unwrap_or(80);
    columns - 2
}

/// Upper-case the first character of a section heading.
pub fn title_heading(heading: &str) -> String {
    let mut chars = heading.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/* -------------------------------------------------------------------------- */
/* Help documents                                                             */
/* -------------------------------------------------------------------------- */

/// One row of a help section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpItem {
    pub invocation: String,
    pub help: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpSection {
    pub heading: String,
    pub items: Vec<HelpItem>,
}

/// Everything a help page shows, before layout.
#[derive(Debug, Clone, Default)]
pub struct HelpDoc {
    pub prog: String,
    pub usage: Vec<String>,
    pub description: Option<String>,
    pub sections: Vec<HelpSection>,
    pub epilog: Option<String>,
}

impl HelpDoc {
    /// Collect the help page of `cmd`, shown under the program name `prog`.
    pub fn from_command(prog: &str, cmd: &Command) -> Self {
        let description = cmd
            .get_long_about()
            .or_else(|| cmd.get_about())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty());
        let epilog = cmd
            .get_after_help()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty());

        let mut positionals = Vec::new();
        let mut optionals = Vec::new();
        for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
            let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
            let item = HelpItem {
                invocation: invocation(arg),
                help,
                depth: 0,
            };
            if arg.is_positional() {
                positionals.push(item);
            } else {
                optionals.push(item);
            }
        }

        let subcommands: Vec<&Command> =
            cmd.get_subcommands().filter(|s| !s.is_hide_set()).collect();
        if !subcommands.is_empty() {
            positionals.push(HelpItem {
                invocation: SUBCOMMAND_METAVAR.to_string(),
                help: String::new(),
                depth: 0,
            });
            for sub in subcommands {
                positionals.push(HelpItem {
                    invocation: sub.get_name().to_string(),
                    help: sub.get_about().map(|s| s.to_string()).unwrap_or_default(),
                    depth: 1,
                });
            }
        }

        let mut sections = Vec::new();
        if !positionals.is_empty() {
            sections.push(HelpSection {
                heading: "positional arguments".into(),
                items: positionals,
            });
        }
        if !optionals.is_empty() {
            sections.push(HelpSection {
                heading: "optional arguments".into(),
                items: optionals,
            });
        }

        HelpDoc {
            prog: prog.to_string(),
            usage: usage_parts(cmd),
            description,
            sections,
            epilog,
        }
    }
}

pub const SUBCOMMAND_METAVAR: &str = "<subcommand>";

/// Usage fragments of `cmd`, one per argument, excluding the program name.
pub fn usage_parts(cmd: &Command) -> Vec<String> {
    let mut parts = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        if !arg.is_positional() {
            parts.push(optional_usage(arg));
        }
    }
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        if arg.is_positional() {
            parts.push(positional_usage(arg));
        }
    }
    if cmd.has_subcommands() {
        parts.push(SUBCOMMAND_METAVAR.to_string());
        parts.push("...".to_string());
    }
    parts
}

/// The `usage: ...` block alone, as printed before parse errors.
pub fn render_usage(prog: &str, cmd: &Command) -> String {
    let formatter = HelpFormatter::new(terminal_width());
    let mut out = String::new();
    formatter.push_usage(&mut out, prog, &usage_parts(cmd));
    out
}

fn value_name(arg: &Arg) -> String {
    arg.get_value_names()
        .and_then(|names| names.first())
        .map(|n| n.to_string())
        .unwrap_or_else(|| arg.get_id().to_string())
}

fn value_range(arg: &Arg) -> (usize, usize) {
    arg.get_num_args()
        .map(|r| (r.min_values(), r.max_values()))
        .unwrap_or((1, 1))
}

fn optional_usage(arg: &Arg) -> String {
    let flag = super::parser::option_strings(arg)
        .into_iter()
        .next()
        .unwrap_or_default();
    let body = if arg.get_action().takes_values() {
        format!("{flag} {}", value_placeholder(arg))
    } else {
        flag
    };
    if arg.is_required_set() {
        body
    } else {
        format!("[{body}]")
    }
}

fn positional_usage(arg: &Arg) -> String {
    let name = value_name(arg);
    let (min, max) = value_range(arg);
    let required = arg.is_required_set();
    if max == usize::MAX {
        if required && min > 0 {
            format!("{name} [{name} ...]")
        } else {
            format!("[{name} ...]")
        }
    } else if max > 1 {
        vec![name; max].join(" ")
    } else if required {
        name
    } else {
        format!("[{name}]")
    }
}

fn value_placeholder(arg: &Arg) -> String {
    let name = value_name(arg);
    match value_range(arg) {
        (0, 1) => format!("[{name}]"),
        (0, usize::MAX) => format!("[{name} ...]"),
        (_, usize::MAX) => format!("{name} [{name} ...]"),
        (_, n) if n > 1 => vec![name; n].join(" "),
        _ => name,
    }
}

fn invocation(arg: &Arg) -> String {
    if arg.is_positional() {
        return value_name(arg);
    }
    let strings = super::parser::option_strings(arg);
    if arg.get_action().takes_values() {
        let value = value_placeholder(arg);
        strings
            .iter()
            .map(|s| format!("{s} {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        strings.join(", ")
    }
}

/* -------------------------------------------------------------------------- */
/* Layout                                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct HelpFormatter {
    pub indent_increment: usize,
    pub max_help_position: usize,
    pub width: usize,
}

impl Default for HelpFormatter {
    fn default() -> Self {
        Self::new(terminal_width())
    }
}

impl HelpFormatter {
    pub fn new(width: usize) -> Self {
        Self {
            indent_increment: INDENT_INCREMENT,
            max_help_position: MAX_HELP_POSITION,
            width,
        }
    }

    pub fn render(&self, doc: &HelpDoc) -> String {
        let mut out = String::new();
        self.push_usage(&mut out, &doc.prog, &doc.usage);

        if let Some(description) = &doc.description {
            out.push('\n');
            self.push_paragraphs(&mut out, description, 0);
        }

        let help_position = self.help_position(doc);
        for section in &doc.sections {
            out.push('\n');
            out.push_str(&title_heading(&section.heading));
            out.push_str(":\n");
            for item in &section.items {
                self.push_item(&mut out, item, help_position);
            }
        }

        if let Some(epilog) = &doc.epilog {
            out.push('\n');
            self.push_paragraphs(&mut out, epilog, 0);
        }
        out
    }

    fn push_usage(&self, out: &mut String, prog: &str, parts: &[String]) {
        let lead = format!("usage: {prog}");
        let continuation = " ".repeat(lead.chars().count() + 1);
        let mut line = lead;
        let mut line_has_part = false;
        for part in parts {
            let fits = line.chars().count() + 1 + part.chars().count() <= self.width;
            if !fits && line_has_part {
                out.push_str(&line);
                out.push('\n');
                line = format!("{continuation}{part}");
            } else {
                line.push(' ');
                line.push_str(part);
            }
            line_has_part = true;
        }
        out.push_str(&line);
        out.push('\n');
    }

    fn push_paragraphs(&self, out: &mut String, text: &str, indent: usize) {
        let width = self.width.saturating_sub(indent).max(11);
        let pad = " ".repeat(indent);
        for (i, paragraph) in text.trim().split("\n\n").enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for line in wrap_text(paragraph, width) {
                out.push_str(&pad);
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    fn help_position(&self, doc: &HelpDoc) -> usize {
        let longest = doc
            .sections
            .iter()
            .flat_map(|s| s.items.iter())
            .map(|item| self.item_indent(item) + item.invocation.chars().count())
            .max()
            .unwrap_or(0);
        (longest + 2).min(self.max_help_position)
    }

    fn item_indent(&self, item: &HelpItem) -> usize {
        self.indent_increment * (item.depth + 1)
    }

    fn push_item(&self, out: &mut String, item: &HelpItem, help_position: usize) {
        let indent = self.item_indent(item);
        let head = format!("{}{}", " ".repeat(indent), item.invocation);
        if item.help.trim().is_empty() {
            out.push_str(&head);
            out.push('\n');
            return;
        }

        let help_width = self.width.saturating_sub(help_position).max(11);
        let lines = wrap_text(&item.help, help_width);
        let head_len = head.chars().count();
        let mut rest = lines.iter();
        if head_len + 2 <= help_position {
            if let Some(first) = rest.next() {
                out.push_str(&head);
                out.push_str(&" ".repeat(help_position - head_len));
                out.push_str(first);
                out.push('\n');
            }
        } else {
            out.push_str(&head);
            out.push('\n');
        }
        for line in rest {
            out.push_str(&" ".repeat(help_position));
            out.push_str(line);
            out.push('\n');
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Record tables                                                              */
/* -------------------------------------------------------------------------- */

/// Render rows as a bordered table:
///
/// ```text
/// +----+------------+
/// | Id | Repository |
/// +----+------------+
/// | 1  | library/a  |
/// +----+------------+
/// ```
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(headers.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };
    let render_row = |cells: Vec<&str>| {
        let mut line = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).copied().unwrap_or("");
            let pad = w - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad + 1));
            line.push('|');
        }
        line
    };

    let mut out = vec![border.clone(), render_row(headers.to_vec()), border.clone()];
    for row in rows {
        out.push(render_row(row.iter().map(String::as_str).collect()));
    }
    out.push(border);
    out.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Text helpers                                                               */
/* -------------------------------------------------------------------------- */

/// Greedy word wrap; whitespace runs collapse to single spaces.
pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + 1;
        if needed > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
