//! Additive merging of `~/.ssh/config`.
//!
//! Homestead only ever adds to an existing config. A required directive counts as present when
//! its keyword appears anywhere in the file, in any block, so a user's own choice (say
//! `ForwardAgent yes` under a specific host) is never duplicated or overridden.

use super::keys::{has_mode, set_mode};
use crate::config::KEY_NAME;
use crate::core::Step;
use anyhow::Context;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Mode of `~/.ssh/config` after every write.
pub const CONFIG_MODE: u32 = 0o600;

/// The header line of the wildcard host block.
pub const WILDCARD: &str = "Host *";

/// Hosts that get a block of their own in a freshly written config.
pub const NAMED_HOSTS: [&str; 2] = ["github.com", "gitlab.com"];

/// One `Keyword value` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub keyword: &'static str,
    pub value: String,
}

impl Directive {
    pub fn new(keyword: &'static str, value: impl Into<String>) -> Self {
        Directive {
            keyword,
            value: value.into(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.value)
    }
}

/// A `Host <pattern>` line and the directives under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostBlock {
    pub pattern: String,
    pub directives: Vec<Directive>,
}

impl fmt::Display for HostBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Host {}", self.pattern)?;
        for directive in &self.directives {
            writeln!(f, "  {directive}")?;
        }
        Ok(())
    }
}

/// An SSH client config as an ordered list of [HostBlock]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshConfigDocument {
    pub blocks: Vec<HostBlock>,
}

impl SshConfigDocument {
    /// The config written when none exists: the wildcard block with every required directive,
    /// followed by a block for each of [NAMED_HOSTS].
    pub fn canonical() -> Self {
        let mut blocks = vec![HostBlock {
            pattern: "*".to_string(),
            directives: required_directives(),
        }];
        blocks.extend(NAMED_HOSTS.iter().map(|host| HostBlock {
            pattern: host.to_string(),
            directives: vec![
                Directive::new("HostName", *host),
                Directive::new("User", "git"),
                Directive::new("IdentityFile", identity_file()),
            ],
        }));
        SshConfigDocument { blocks }
    }
}

impl fmt::Display for SshConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

/// `~/.ssh/id_ed25519`, as written in the config.
pub fn identity_file() -> String {
    format!("~/.ssh/{KEY_NAME}")
}

/// The directives the wildcard block must provide, in canonical order.
pub fn required_directives() -> Vec<Directive> {
    vec![
        Directive::new("AddKeysToAgent", "yes"),
        Directive::new("ForwardAgent", "no"),
        Directive::new("IdentityFile", identity_file()),
        Directive::new("HashKnownHosts", "yes"),
    ]
}

/// Returns the keyword of a config line, or `None` for blank lines and comments.
///
/// Keywords are separated from their arguments by white space or `=`.
fn keyword(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.split(|c: char| c.is_whitespace() || c == '=')
        .next()
        .filter(|keyword| !keyword.is_empty())
}

/// Returns the required directives whose keyword appears nowhere in `text`. Keywords are
/// case-insensitive.
pub fn missing_directives(text: &str) -> Vec<Directive> {
    required_directives()
        .into_iter()
        .filter(|directive| {
            !text
                .lines()
                .filter_map(keyword)
                .any(|keyword| keyword.eq_ignore_ascii_case(directive.keyword))
        })
        .collect()
}

/// Merges the required directives into an existing config.
///
/// With no existing config (or one holding only white space), returns the canonical document.
/// Otherwise each missing directive is inserted right after the first `Host *` line, and every
/// other byte is kept as is. If there is no `Host *` line, a wildcard block holding the missing
/// directives is appended. A config that already has every directive is returned unchanged.
pub fn merge(existing: Option<&str>) -> String {
    let text = match existing {
        Some(text) if !text.trim().is_empty() => text,
        _ => return SshConfigDocument::canonical().to_string(),
    };

    let missing = missing_directives(text);
    if missing.is_empty() {
        return text.to_string();
    }

    let mut merged = text.to_string();
    match header_end(text) {
        Some(end) => {
            let header = &text[..end];
            let (eol, terminated) = if header.ends_with("\r\n") {
                ("\r\n", true)
            } else if header.ends_with('\n') {
                ("\n", true)
            } else {
                (line_ending(text), false)
            };
            let mut lines = directive_lines(&missing, eol);
            if !terminated {
                lines.insert_str(0, eol);
            }
            merged.insert_str(end, &lines);
        }
        None => {
            let eol = line_ending(text);
            if !merged.ends_with('\n') {
                merged.push_str(eol);
            }
            merged.push_str(eol);
            merged.push_str(WILDCARD);
            merged.push_str(eol);
            merged.push_str(&directive_lines(&missing, eol));
        }
    }
    merged
}

fn directive_lines(directives: &[Directive], eol: &str) -> String {
    directives
        .iter()
        .map(|directive| format!("  {directive}{eol}"))
        .collect()
}

/// The terminator of the first line of `text`: `\r\n` or `\n`.
fn line_ending(text: &str) -> &'static str {
    match text.find('\n') {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Returns the byte offset just past the first `Host *` line, including its terminator if any.
fn header_end(text: &str) -> Option<usize> {
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        offset += raw.len();
        if raw.trim() == WILDCARD {
            return Some(offset);
        }
    }
    None
}

/// Ensures `~/.ssh/config` holds the required directives and has mode 0600.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigStep {
    path: PathBuf,
}

impl ConfigStep {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStep { path: path.into() }
    }

    fn read(&self) -> anyhow::Result<Option<String>> {
        read_optional(&self.path)
    }
}

impl Step for ConfigStep {
    fn name(&self) -> &str {
        "ssh config"
    }

    fn check(&self) -> anyhow::Result<bool> {
        match self.read()? {
            Some(text) if !text.trim().is_empty() && missing_directives(&text).is_empty() => {
                has_mode(&self.path, CONFIG_MODE)
            }
            _ => Ok(false),
        }
    }

    fn apply(&self) -> anyhow::Result<()> {
        let existing = self.read()?;
        let merged = merge(existing.as_deref());
        if existing.as_deref() != Some(merged.as_str()) {
            tracing::debug!(path = %self.path.display(), "writing ssh config");
            write_private(&self.path, &merged)
                .with_context(|| format!("could not write {}", self.path.display()))?;
        }
        set_mode(&self.path, CONFIG_MODE)
    }
}

/// Writes `text` to `path`, creating the file with [CONFIG_MODE].
fn write_private(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(CONFIG_MODE)
        .open(path)?;
    file.write_all(text.as_bytes())
}

fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("could not read {}", path.display())),
    }
}
