//! Reports the outcome of each [Step] to the user.
//!
//! The arrangement of this module is a bit unusual. Instead of presenting a generic method that
//! the user calls with either a real or a fake trait implementation, the user chooses either a
//! real or a fake trait implementation and calls that trait's methods. Each trait method calls a
//! free function that provides all of the logic for writing to stdout and stderr writers that can
//! be either real or fake. This arrangement allows the real trait implementation to lock stdout
//! and stderr just before reporting and release the locks as soon as reporting is done.
//!
//! [Step]: crate::core::Step

use crate::core::{Class, Outcome};
use std::env;
use std::io::{self, Write};

/// Prints feedback about each step to stdout/stderr to keep the user informed.
pub trait Report {
    /// Reports how a step ended.
    fn outcome(&mut self, name: &str, class: Class, outcome: &Outcome) -> io::Result<()>;

    /// Reports a plain message to stdout, e.g. the public key.
    fn note(&mut self, message: &str) -> io::Result<()>;

    /// Reports the totals after a run.
    fn summary(&mut self, summary: &Summary) -> io::Result<()>;
}

/// Counts of each [Outcome] over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl Summary {
    /// Counts one more outcome.
    pub fn record(&mut self, class: Class, outcome: &Outcome) {
        match (outcome, class) {
            (Outcome::Applied, _) => self.applied += 1,
            (Outcome::Skipped, _) => self.skipped += 1,
            (Outcome::Failed(_), Class::BestEffort) => self.warnings += 1,
            (Outcome::Failed(_), Class::Required) => self.failed += 1,
        }
    }
}

/// The real, production-ready [Report] implementation. Uses the real stdout/stderr.
#[derive(Clone, Debug)]
pub struct Reporter {
    color: bool,
}

impl Reporter {
    /// Creates a [Reporter]. Colors are enabled unless `NO_COLOR` is set.
    pub fn new() -> Self {
        Reporter {
            color: env::var_os("NO_COLOR").is_none(),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Report for Reporter {
    fn outcome(&mut self, name: &str, class: Class, outcome: &Outcome) -> io::Result<()> {
        // We need to release the locks as soon as we're done reporting rather than holding them
        // across invocations, so we take them here instead of storing them in the struct.
        let mut stdout = io::stdout().lock();
        let mut stderr = io::stderr().lock();
        _outcome(&mut stdout, &mut stderr, self.color, name, class, outcome)
    }

    fn note(&mut self, message: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{message}")
    }

    fn summary(&mut self, summary: &Summary) -> io::Result<()> {
        _summary(io::stdout().lock(), summary)
    }
}

/// A [Report] implementation that collects everything in memory. Colors are never used.
#[derive(Clone, Debug, Default)]
pub struct Buffered {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Buffered {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to stdout so far, lossily decoded.
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Everything written to stderr so far, lossily decoded.
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl Report for Buffered {
    fn outcome(&mut self, name: &str, class: Class, outcome: &Outcome) -> io::Result<()> {
        _outcome(&mut self.stdout, &mut self.stderr, false, name, class, outcome)
    }

    fn note(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.stdout, "{message}")
    }

    fn summary(&mut self, summary: &Summary) -> io::Result<()> {
        _summary(&mut self.stdout, summary)
    }
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Wraps `tag` in brackets, colored when `color` is set.
fn tag(color: bool, code: &str, tag: &str) -> String {
    if color {
        format!("{code}[{tag}]{RESET}")
    } else {
        format!("[{tag}]")
    }
}

/// A testable function containing the logic for reporting a step's [Outcome].
///
/// Successes go to `stdout`. Failures go to `stderr`: as a warning for best-effort steps and as
/// a failure for required ones.
pub fn _outcome(
    mut stdout: impl Write,
    mut stderr: impl Write,
    color: bool,
    name: &str,
    class: Class,
    outcome: &Outcome,
) -> io::Result<()> {
    match (outcome, class) {
        (Outcome::Applied, _) => writeln!(stdout, "{} {name}", tag(color, GREEN, "applied")),
        (Outcome::Skipped, _) => writeln!(stdout, "{} {name}", tag(color, DIM, "skipped")),
        (Outcome::Failed(reason), Class::BestEffort) => {
            writeln!(stderr, "{} {name}: {reason}", tag(color, YELLOW, "warning"))
        }
        (Outcome::Failed(reason), Class::Required) => {
            writeln!(stderr, "{} {name}: {reason}", tag(color, RED, "failed"))
        }
    }
}

/// A testable function containing the logic for reporting a [Summary].
pub fn _summary(mut stdout: impl Write, summary: &Summary) -> io::Result<()> {
    let Summary {
        applied,
        skipped,
        warnings,
        failed,
    } = summary;
    write!(stdout, "{applied} applied, {skipped} already satisfied")?;
    if *warnings > 0 {
        write!(stdout, ", {warnings} warning(s)")?;
    }
    if *failed > 0 {
        write!(stdout, ", {failed} failed")?;
    }
    writeln!(stdout)
}
