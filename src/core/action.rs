//! Types for representing the individual actions a manifest task can take.

pub mod line_in_file;
pub mod step;

#[doc(inline)]
pub use line_in_file::line_in_file;

#[doc(inline)]
pub use step::ActionStep;

use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

/// The kinds of work a machine-setup task can perform.
///
/// Every action has a built-in condition checker, so a manifest can be run again and again. See
/// [ActionStep] for what each action checks before running.
///
/// # (De)serialization
///
/// In YAML, an action is written as a single-key map naming its kind, e.g.
/// `packages: [zsh, git]`. [Task] applies `serde_yaml::with::singleton_map` to get that shape
/// instead of YAML tags.
///
/// [Task]: crate::core::Task
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Installs packages with the system package manager.
    Packages(Vec<String>),

    /// Clones a git repository unless `dest` already exists.
    #[serde(rename = "clone")]
    GitClone { repo: String, dest: String },

    /// Downloads a file unless `dest` already exists.
    Download { url: String, dest: String },

    /// Ensures that `line` is present in the file at `path`.
    ///
    /// If the line is missing, it replaces the first line containing `pattern`, or is inserted
    /// after the first line containing `after`, or is appended, in that order of preference.
    LineInFile {
        path: String,
        line: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<String>,
        /// Ignore leading white space when comparing lines.
        #[serde(default)]
        indent: bool,
    },

    /// Runs shell commands.
    ///
    /// The commands are skipped if the path `creates` exists or the shell command `unless` exits
    /// successfully. Without either guard, the commands run every time.
    Command {
        run: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        creates: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unless: Option<String>,
    },

    /// Runs the SSH key setup: key pair, `~/.ssh/config`, and optionally agent and clipboard.
    SshKeys {
        #[serde(default = "enabled")]
        agent: bool,
        #[serde(default)]
        copy: bool,
    },
}

fn enabled() -> bool {
    true
}

impl Action {
    /// Generates a one-line identifier for an [Action], suitable for diagnostics.
    pub fn title(&self) -> String {
        use Action::*;
        match self {
            Packages(packages) => format!("packages: {}", packages.join(" ")),
            GitClone { repo, dest } => format!("clone: {repo} -> {dest}"),
            Download { url, dest } => format!("download: {url} -> {dest}"),
            LineInFile { path, line, .. } => format!("line_in_file ({path}): {line}"),
            Command { run, .. } => format!("command: {}", run.join("; ")),
            SshKeys { .. } => "ssh_keys".to_string(),
        }
    }

    /// Returns a copy of this [Action] with variables substituted into every string field.
    ///
    /// # Variable substitution
    ///
    /// There are two forms:
    ///
    /// 1. Simple substitution (`$var`): replaced with the value of `var` if it exists. Names match
    ///    on word boundaries, so `$foobar` does not match the variable `foo`. Use the braced form
    ///    for that: `${foo}bar`.
    ///
    /// 2. Braced substitution (`${var}`): replaced with the value of `var` if it exists.
    ///
    /// Anything that does not match a defined variable passes through unchanged, so shell
    /// variables in [Action::Command] still reach the shell.
    ///
    /// # Substitution order
    ///
    /// Variables are substituted in the order in which they appear in `vars`. A value that
    /// contains a reference to a later variable is therefore expanded by that later pass.
    pub fn compile(&self, vars: &IndexMap<String, String>) -> anyhow::Result<Action> {
        let mut action = self.clone();

        for (var, value) in vars {
            // Match $<var> as a whole word and ${<var>}. A single regex keeps one pass from
            // re-expanding the output of the other.
            let var = regex::escape(var);
            let regex = Regex::new(&format!(r"\${var}\b|\$\{{{var}}}"))?;

            let replace = |s: &mut String| {
                let replaced = regex.replace_all(s, NoExpand(value)).into_owned();
                *s = replaced;
            };
            let replace_opt = |s: &mut Option<String>| {
                if let Some(s) = s {
                    replace(s);
                }
            };

            use Action::*;
            match &mut action {
                Packages(packages) => packages.iter_mut().for_each(&replace),
                GitClone { repo, dest } => {
                    replace(repo);
                    replace(dest);
                }
                Download { url, dest } => {
                    replace(url);
                    replace(dest);
                }
                LineInFile {
                    path,
                    line,
                    pattern,
                    after,
                    indent: _,
                } => {
                    replace(path);
                    replace(line);
                    replace_opt(pattern);
                    replace_opt(after);
                }
                Command {
                    run,
                    creates,
                    unless,
                } => {
                    run.iter_mut().for_each(&replace);
                    replace_opt(creates);
                    replace_opt(unless);
                }
                SshKeys { .. } => {}
            }
        }
        Ok(action)
    }
}
