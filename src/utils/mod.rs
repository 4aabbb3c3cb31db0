//! Utilities: logging setup (tracing), ctrl-c handling, env-var defaults,
//! record tables.
//!
//! Key items:
//!   logging::init_logging / logging::derive_level
//!   interrupt::install / interrupt::state
//!   env / env_with
//!   format_list / print_list

use std::cmp::Ordering;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::format;

/// Logging helpers.
pub mod logging {
    use tracing::Level;
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    /// `--debug` switches to DEBUG; everything else logs warnings only.
    pub fn derive_level(debug: bool) -> Level {
        if debug { Level::DEBUG } else { Level::WARN }
    }

    /// Install the stderr subscriber. `RUST_LOG` directives apply on top of
    /// `level`; HTTP internals stay at WARN. Later calls are no-ops.
    pub fn init_logging(level: Level) {
        let mut filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy();
        for noisy in ["hyper=warn", "hyper_util=warn", "reqwest=warn"] {
            if let Ok(directive) = noisy.parse() {
                filter = filter.add_directive(directive);
            }
        }

        let debug = level >= Level::DEBUG;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(debug)
            .with_line_number(debug)
            .without_time()
            .try_init();
    }

}

/// Ctrl-c handling for the whole process.
///
/// One handler is installed at startup. While a request is in flight the
/// signal wakes it and the request fails with [`Interrupted`]; at any other
/// point the notice is printed and the process exits with status 130.
pub mod interrupt {
    use std::future::Future;
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::{Context, Result};
    use thiserror::Error;
    use tokio::sync::Notify;

    use crate::cmd::shell::INTERRUPTED_STATUS;

    pub const TERMINATING_NOTICE: &str = "... terminating harbor client";

    /// The user pressed ctrl-c.
    #[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
    #[error("interrupted")]
    pub struct Interrupted;

    #[derive(Debug, Default)]
    pub struct InterruptState {
        requested: AtomicBool,
        in_flight: AtomicBool,
        wake: Notify,
    }

    impl InterruptState {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record a ctrl-c. Returns `true` when nothing is in flight to
        /// unwind, i.e. the caller should terminate right away.
        pub fn signal(&self) -> bool {
            // requested before in_flight; `guard` clears in_flight before
            // reading requested, so one side always sees the other.
            self.requested.store(true, Ordering::SeqCst);
            if self.in_flight.load(Ordering::SeqCst) {
                self.wake.notify_one();
                false
            } else {
                true
            }
        }

        pub fn requested(&self) -> bool {
            self.requested.load(Ordering::SeqCst)
        }

        pub fn in_flight(&self) -> bool {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Run `fut`, failing with [`Interrupted`] if ctrl-c arrives before
        /// or while it completes.
        pub async fn guard<F, T>(&self, fut: F) -> Result<T>
        where
            F: Future<Output = Result<T>>,
        {
            self.in_flight.store(true, Ordering::SeqCst);
            let result = tokio::select! {
                result = fut => result,
                _ = self.wake.notified() => Err(Interrupted.into()),
            };
            self.in_flight.store(false, Ordering::SeqCst);
            if self.requested() {
                return Err(Interrupted.into());
            }
            result
        }
    }

    static STATE: LazyLock<InterruptState> = LazyLock::new(InterruptState::new);

    /// Process-wide state the installed handler reports to.
    pub fn state() -> &'static InterruptState {
        &STATE
    }

    /// Install the process ctrl-c handler. Call once, before any work.
    pub fn install() -> Result<()> {
        ctrlc::set_handler(|| {
            if state().signal() {
                eprintln!("{TERMINATING_NOTICE}");
                std::process::exit(INTERRUPTED_STATUS);
            }
        })
        .context("failed to install the ctrl-c handler")
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::Arc;
        use std::time::Duration;

        fn runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
        }

        #[test]
        fn signal_while_idle_terminates() {
            let state = InterruptState::new();
            assert!(state.signal());
            assert!(state.requested());
        }

        #[test]
        fn signal_during_request_fails_it() {
            let state = Arc::new(InterruptState::new());
            let sender = {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    while !state.in_flight() {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    state.signal()
                })
            };
            let result: Result<()> =
                runtime().block_on(state.guard(std::future::pending::<Result<()>>()));
            assert!(!sender.join().unwrap(), "in-flight signal must not terminate");
            let err = result.unwrap_err();
            assert!(err.downcast_ref::<Interrupted>().is_some());
            assert!(!state.in_flight());
        }

        #[test]
        fn completed_request_passes_through() {
            let state = InterruptState::new();
            let value = runtime().block_on(state.guard(async { Ok(7) })).unwrap();
            assert_eq!(value, 7);
            assert!(!state.in_flight());
            // Nothing is in flight any more, so a later signal terminates.
            assert!(state.signal());
        }

        #[test]
        fn signal_racing_completion_still_interrupts() {
            let state = InterruptState::new();
            let result: Result<i32> = runtime().block_on(state.guard(async {
                // Lands while in flight, but the future is already finishing.
                assert!(!state.signal());
                Ok(1)
            }));
            assert!(result.unwrap_err().downcast_ref::<Interrupted>().is_some());
        }
    }
}

/// First set, non-empty environment variable among `names`, else `default`.
pub fn env(names: &[&str], default: &str) -> String {
    env_with(|name| std::env::var(name).ok(), names, default)
}

/// [`env`] against an arbitrary lookup.
pub fn env_with<F>(lookup: F, names: &[&str], default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => cell(a).cmp(&cell(b)),
    }
}

/// `update_time` -> `Update Time`
fn field_heading(field: &str) -> String {
    field
        .split('_')
        .map(format::title_heading)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `items` as a table of the given fields, optionally sorted by one
/// of them (numbers compare numerically).
pub fn format_list<T: Serialize>(items: &[T], fields: &[&str], sortby: Option<&str>) -> Result<String> {
    let mut records = items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .context("failed to serialize records")?;
    if let Some(key) = sortby {
        records.sort_by(|a, b| compare_values(a.get(key), b.get(key)));
    }

    let headers: Vec<String> = fields.iter().map(|f| field_heading(f)).collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| fields.iter().map(|f| cell(record.get(*f))).collect())
        .collect();
    Ok(format::table(&header_refs, &rows))
}

/// [`format_list`] written to stdout.
pub fn print_list<T: Serialize>(items: &[T], fields: &[&str], sortby: Option<&str>) -> Result<()> {
    let rendered = format_list(items, fields, sortby)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{rendered}").context("failed to write to stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn env_takes_first_non_empty() {
        let vars = lookup(&[("HARBOR_URL", ""), ("OS_BASEURL", "http://os")]);
        assert_eq!(env_with(&vars, &["HARBOR_URL", "OS_BASEURL"], "d"), "http://os");
        assert_eq!(env_with(&vars, &["MISSING"], "d"), "d");
        assert_eq!(env_with(&vars, &["MISSING"], ""), "");
    }

    #[test]
    fn headings_are_title_cased() {
        assert_eq!(field_heading("update_time"), "Update Time");
        assert_eq!(field_heading("id"), "Id");
    }

    #[test]
    fn list_sorts_numerically() {
        let items = vec![
            json!({"id": 10, "status": "finished"}),
            json!({"id": 9, "status": "running"}),
            json!({"id": 100, "status": null}),
        ];
        let out = format_list(&items, &["id", "status"], Some("id")).unwrap();
        let ids: Vec<&str> = out
            .lines()
            .filter(|l| l.starts_with("| ") && !l.contains("Id"))
            .map(|l| l.trim_start_matches("| ").split(' ').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["9", "10", "100"]);
        assert!(out.contains("| Id  | Status   |"), "{out}");
    }
}
