/*!
Argument declarations bound to subcommand handlers.

Each handler module describes its arguments with a function returning an
`ArgSpec`. Declarations are bound one at a time through `ArgSpec::add_arg`,
which prepends (decorator composition order) and skips exact duplicates.
`ArgSpec::from_decls` binds a written list so the final order matches the
order it was written in.

Nothing here validates option combinations; `cmd::parser::build_arg` does
that when the registry turns a declaration into a clap argument.
*/

/// How many values an argument consumes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Nargs {
    /// Exactly one value.
    #[default]
    One,
    /// `?` - zero or one value.
    Optional,
    /// `*` - any number of values.
    ZeroOrMore,
    /// `+` - at least one value.
    OneOrMore,
    /// A fixed number of values.
    Exactly(usize),
}

/// What the parser does when it meets the argument.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Action {
    #[default]
    Store,
    StoreTrue,
    StoreFalse,
    Append,
    Count,
}

impl Action {
    /// Flag-style actions never consume a value.
    pub fn takes_value(self) -> bool {
        matches!(self, Action::Store | Action::Append)
    }
}

/// Type the stored value is converted to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ValueKind {
    #[default]
    Str,
    Int,
}

/// Help text for an argument.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Help {
    #[default]
    None,
    Text(String),
    /// Accepted but left out of help output.
    Suppressed,
}

/// One declared argument: its option strings plus the option map.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArgDecl {
    pub names: Vec<String>,
    pub metavar: Option<String>,
    pub help: Help,
    pub nargs: Nargs,
    pub choices: Vec<String>,
    pub default: Option<String>,
    pub action: Action,
    pub required: bool,
    pub dest: Option<String>,
    pub kind: ValueKind,
}

impl ArgDecl {
    /// Start a declaration from its option strings, e.g. `["policy_id"]`
    /// or `["--page-size", "--page_size"]`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Help::Text(help.into());
        self
    }

    pub fn suppress_help(mut self) -> Self {
        self.help = Help::Suppressed;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = nargs;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    /// A declaration is positional when its single name has no leading dash.
    pub fn is_positional(&self) -> bool {
        matches!(self.names.as_slice(), [name] if !name.starts_with('-'))
    }

    /// Key the parsed value is stored under.
    ///
    /// Positionals use their name; flags use the first long spelling with
    /// dashes turned into underscores, falling back to the first short one.
    pub fn dest_name(&self) -> String {
        if let Some(dest) = &self.dest {
            return dest.clone();
        }
        if self.is_positional() {
            return self.names[0].clone();
        }
        let long = self.names.iter().find(|n| n.starts_with("--"));
        let chosen = long.or_else(|| self.names.first());
        chosen
            .map(|n| n.trim_start_matches('-').replace('-', "_"))
            .unwrap_or_default()
    }

    /// Placeholder shown for the value in usage and help.
    pub fn display_metavar(&self) -> String {
        match &self.metavar {
            Some(m) => m.clone(),
            None if self.is_positional() => self.dest_name(),
            None => self.dest_name().to_ascii_uppercase(),
        }
    }
}

/// Ordered argument declarations of one handler.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArgSpec {
    decls: Vec<ArgDecl>,
}

impl ArgSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one declaration. Prepends, and ignores an identical declaration
    /// that is already bound.
    pub fn add_arg(&mut self, decl: ArgDecl) {
        if !self.decls.contains(&decl) {
            self.decls.insert(0, decl);
        }
    }

    /// Bind a written list of declarations, last one first, so the result
    /// reads top to bottom.
    pub fn from_decls<I>(decls: I) -> Self
    where
        I: IntoIterator<Item = ArgDecl>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut spec = Self::new();
        for decl in decls.into_iter().rev() {
            spec.add_arg(decl);
        }
        spec
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(spec: &ArgSpec) -> Vec<String> {
        spec.iter().map(|d| d.names.join("/")).collect()
    }

    #[test]
    fn written_order_is_preserved() {
        let spec = ArgSpec::from_decls([
            ArgDecl::new(["policy_id"]).metavar("<policy_id>"),
            ArgDecl::new(["--status"]).choices(["running", "finished"]),
            ArgDecl::new(["--page"]).kind(ValueKind::Int),
        ]);
        assert_eq!(names(&spec), vec!["policy_id", "--status", "--page"]);
    }

    #[test]
    fn add_arg_prepends_like_stacked_decorators() {
        // Decorators apply bottom-up: the last written binds first.
        let mut spec = ArgSpec::new();
        spec.add_arg(ArgDecl::new(["third"]));
        spec.add_arg(ArgDecl::new(["second"]));
        spec.add_arg(ArgDecl::new(["first"]));
        assert_eq!(names(&spec), vec!["first", "second", "third"]);
    }

    #[test]
    fn identical_declaration_binds_once() {
        let decl = ArgDecl::new(["job_id"]).metavar("<job_id>").help("The job id.");
        let mut spec = ArgSpec::from_decls([decl.clone(), ArgDecl::new(["--verbose"])]);
        spec.add_arg(decl.clone());
        spec.add_arg(decl);
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn differing_options_are_distinct() {
        let mut spec = ArgSpec::new();
        spec.add_arg(ArgDecl::new(["job_id"]).help("one"));
        spec.add_arg(ArgDecl::new(["job_id"]).help("two"));
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn dest_derivation() {
        assert_eq!(ArgDecl::new(["policy_id"]).dest_name(), "policy_id");
        assert_eq!(
            ArgDecl::new(["--page-size", "--page_size"]).dest_name(),
            "page_size"
        );
        assert_eq!(ArgDecl::new(["-s", "--status"]).dest_name(), "status");
        assert_eq!(ArgDecl::new(["-v"]).dest_name(), "v");
        assert_eq!(ArgDecl::new(["--x"]).dest("other").dest_name(), "other");
    }

    #[test]
    fn positional_detection_and_metavar() {
        let pos = ArgDecl::new(["command"]);
        assert!(pos.is_positional());
        assert_eq!(pos.display_metavar(), "command");

        let flag = ArgDecl::new(["--repository"]);
        assert!(!flag.is_positional());
        assert_eq!(flag.display_metavar(), "REPOSITORY");
        assert_eq!(flag.metavar("<repo>").display_metavar(), "<repo>");
    }

    #[test]
    fn flag_actions_take_no_value() {
        assert!(Action::Store.takes_value());
        assert!(Action::Append.takes_value());
        assert!(!Action::StoreTrue.takes_value());
        assert!(!Action::Count.takes_value());
    }
}
