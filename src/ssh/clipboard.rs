//! Copies the public key to the clipboard.

use super::keys::KeyPair;
use crate::client;
use crate::core::{Class, Step};
use anyhow::bail;
use std::path::PathBuf;

/// Something that can hold text for pasting.
pub trait Clipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()>;
}

/// Clipboard utilities, in order of preference, with the arguments that make them read stdin.
const UTILITIES: [(&str, &[&str]); 4] = [
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
];

/// The real [Clipboard]: the first utility from [UTILITIES] on `PATH` that succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        copy_with(text, |program| client::which(program))
    }
}

/// Pipes `text` into the first of [UTILITIES] that `find` locates and that succeeds.
fn copy_with(text: &str, find: impl Fn(&str) -> Option<PathBuf>) -> anyhow::Result<()> {
    let mut last_error = None;
    for (program, args) in UTILITIES {
        let Some(path) = find(program) else {
            continue;
        };
        match client::pipe(&path, args, text.as_bytes()) {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::debug!(program, error = %err, "clipboard utility failed");
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(err),
        None => bail!("no clipboard utility found (tried wl-copy, xclip, xsel, pbcopy)"),
    }
}

/// Copies the public key to the clipboard. Best effort.
///
/// There is no way to tell whether the clipboard already holds the key, so this step always
/// applies.
pub struct ClipboardStep<'a> {
    pair: KeyPair,
    clipboard: &'a dyn Clipboard,
}

impl<'a> ClipboardStep<'a> {
    pub fn new(pair: KeyPair, clipboard: &'a dyn Clipboard) -> Self {
        ClipboardStep { pair, clipboard }
    }
}

impl Step for ClipboardStep<'_> {
    fn name(&self) -> &str {
        "copy public key"
    }

    fn class(&self) -> Class {
        Class::BestEffort
    }

    fn check(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn apply(&self) -> anyhow::Result<()> {
        let public = self.pair.public_key()?;
        self.clipboard.copy(&public)
    }

    fn verify(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}
