//! Adapts a compiled [Action] into a [Step] with a condition checker and a mutator.

use super::line_in_file::{file_has_line, line_in_file};
use super::Action;
use crate::client;
use crate::core::step::{Class, Step};
use anyhow::{bail, Context};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// A single machine-setup task, ready to run.
///
/// | Action | Already satisfied when |
/// |---|---|
/// | [Action::Packages] | `dpkg-query` reports every package as installed |
/// | [Action::GitClone] | the destination exists |
/// | [Action::Download] | the destination exists |
/// | [Action::LineInFile] | the line is present |
/// | [Action::Command] | `creates` exists, or `unless` exits successfully |
///
/// [Action::SshKeys] is not an [ActionStep]; a manifest expands it into the SSH key steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionStep {
    name: String,
    class: Class,
    action: Action,
    home: PathBuf,
    sudo: bool,
}

impl ActionStep {
    /// Wraps an already-compiled [Action].
    ///
    /// `home` expands a leading `~/` in paths. `sudo` prefixes package installation with `sudo`.
    ///
    /// # Errors
    ///
    /// Returns an error for [Action::SshKeys] and for an [Action::Command] with no commands.
    pub fn new(
        name: impl Into<String>,
        class: Class,
        action: Action,
        home: impl Into<PathBuf>,
        sudo: bool,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        match &action {
            Action::SshKeys { .. } => {
                bail!("task \"{name}\": ssh_keys expands into several steps and cannot run alone")
            }
            Action::Command { run, .. } if run.is_empty() => {
                bail!("task \"{name}\": command has nothing to run")
            }
            Action::Packages(packages) if packages.is_empty() => {
                bail!("task \"{name}\": packages list is empty")
            }
            _ => {}
        }
        Ok(ActionStep {
            name,
            class,
            action,
            home: home.into(),
            sudo,
        })
    }

    /// Expands a leading `~` or `~/` against the home directory.
    fn path(&self, path: &str) -> PathBuf {
        if path == "~" {
            self.home.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            PathBuf::from(path)
        }
    }
}

impl Step for ActionStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> Class {
        self.class
    }

    fn check(&self) -> anyhow::Result<bool> {
        use Action::*;
        match &self.action {
            Packages(packages) => {
                for package in packages {
                    if !package_installed(package)? {
                        tracing::debug!(package = %package, "package not installed");
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            GitClone { dest, .. } | Download { dest, .. } => exists(&self.path(dest)),
            LineInFile {
                path, line, indent, ..
            } => file_has_line(self.path(path), line, *indent)
                .with_context(|| format!("could not read {path}")),
            Command {
                creates, unless, ..
            } => {
                if let Some(creates) = creates {
                    if exists(&self.path(creates))? {
                        return Ok(true);
                    }
                }
                if let Some(unless) = unless {
                    if client::succeeds("sh", &["-c", unless])? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            SshKeys { .. } => bail!("ssh_keys cannot be checked as a single step"),
        }
    }

    fn apply(&self) -> anyhow::Result<()> {
        use Action::*;
        match &self.action {
            Packages(packages) => {
                for (program, args) in apt_commands(self.sudo, packages) {
                    client::run(program, &args)?;
                }
                Ok(())
            }
            GitClone { repo, dest } => {
                let dest = self.path(dest);
                create_parent(&dest)?;
                let args = [
                    OsStr::new("clone"),
                    OsStr::new("--depth"),
                    OsStr::new("1"),
                    OsStr::new(repo),
                    dest.as_os_str(),
                ];
                client::run("git", &args)
            }
            Download { url, dest } => {
                let dest = self.path(dest);
                create_parent(&dest)?;
                let args = [
                    OsStr::new("-fsSL"),
                    OsStr::new("-o"),
                    dest.as_os_str(),
                    OsStr::new(url),
                ];
                let result = client::run("curl", &args);
                if result.is_err() {
                    // Never leave a partial download behind; it would satisfy the check next time.
                    let _ = fs::remove_file(&dest);
                }
                result
            }
            LineInFile {
                path,
                line,
                pattern,
                after,
                indent,
            } => {
                line_in_file(
                    self.path(path),
                    line,
                    pattern.as_deref(),
                    after.as_deref(),
                    *indent,
                )
                .with_context(|| format!("could not update {path}"))?;
                Ok(())
            }
            Command { run, .. } => {
                for command in run {
                    client::run("sh", &["-c", command])?;
                }
                Ok(())
            }
            SshKeys { .. } => bail!("ssh_keys cannot be applied as a single step"),
        }
    }

    fn verify(&self) -> anyhow::Result<bool> {
        match &self.action {
            // Unguarded commands have no observable condition; success of every command is the
            // only evidence available.
            Action::Command {
                creates: None,
                unless: None,
                ..
            } => Ok(true),
            _ => self.check(),
        }
    }
}

/// Refreshes the package lists, then installs `packages`. A fresh image has empty lists.
fn apt_commands(sudo: bool, packages: &[String]) -> Vec<(OsString, Vec<OsString>)> {
    let mut install = vec!["install", "-y", "--no-install-recommends"];
    install.extend(packages.iter().map(String::as_str));
    vec![
        client::privileged(sudo, "apt-get", &["update", "-q"]),
        client::privileged(sudo, "apt-get", &install),
    ]
}

/// Asks `dpkg-query` whether a package is installed.
fn package_installed(package: &str) -> anyhow::Result<bool> {
    let mut command = std::process::Command::new("dpkg-query");
    command.args(["-W", "-f=${Status}", package]);
    let output = client::capture(&mut command)?;
    Ok(output.status.success()
        && String::from_utf8_lossy(&output.stdout).contains("install ok installed"))
}

fn exists(path: &Path) -> anyhow::Result<bool> {
    path.try_exists()
        .with_context(|| format!("could not determine whether {} exists", path.display()))
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory {}", parent.display()))?;
    }
    Ok(())
}
