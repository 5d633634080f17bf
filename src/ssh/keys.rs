//! The SSH directory and the ed25519 key pair inside it.

use crate::client;
use crate::core::Step;
use anyhow::Context;
use std::ffi::{OsStr, OsString};
use std::fs::{self, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Mode of `~/.ssh`.
pub const DIR_MODE: u32 = 0o700;

/// Mode of the private key.
pub const PRIVATE_MODE: u32 = 0o600;

/// Mode of the public key.
pub const PUBLIC_MODE: u32 = 0o644;

/// The locations of a key pair and the comment to embed in a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub private: PathBuf,
    pub public: PathBuf,
    pub comment: String,
}

impl KeyPair {
    /// Describes the pair whose private key is at `private`. The public key sits next to it with
    /// a `.pub` suffix.
    pub fn new(private: impl Into<PathBuf>, comment: impl Into<String>) -> Self {
        let private = private.into();
        KeyPair {
            public: public_path(&private),
            private,
            comment: comment.into(),
        }
    }

    /// Reads the public key, without its trailing newline.
    pub fn public_key(&self) -> anyhow::Result<String> {
        let text = fs::read_to_string(&self.public)
            .with_context(|| format!("could not read {}", self.public.display()))?;
        Ok(text.trim_end().to_string())
    }
}

/// Returns the path of the public key for a private key: the same path plus `.pub`.
pub fn public_path(private: impl AsRef<Path>) -> PathBuf {
    let mut public: OsString = private.as_ref().to_owned().into();
    public.push(".pub");
    public.into()
}

/// Returns the base64 body of an OpenSSH public key line, e.g. the `AAAA...` in
/// `ssh-ed25519 AAAA... user@host`.
pub fn key_body(public_key: &str) -> Option<&str> {
    public_key.split_whitespace().nth(1)
}

/// Creates and inspects key pairs.
pub trait KeyTool {
    /// Generates a new pair at `pair.private` and `pair.public`. Neither file exists beforehand.
    fn generate(&self, pair: &KeyPair) -> anyhow::Result<()>;

    /// Computes the public key line for an existing private key.
    fn derive_public(&self, private: &Path) -> anyhow::Result<String>;
}

/// The real [KeyTool], backed by `ssh-keygen`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SshKeygen;

impl KeyTool for SshKeygen {
    fn generate(&self, pair: &KeyPair) -> anyhow::Result<()> {
        // ssh-keygen -q -t ed25519 -C <comment> -N "" -f <private>
        let args = [
            OsStr::new("-q"),
            OsStr::new("-t"),
            OsStr::new("ed25519"),
            OsStr::new("-C"),
            OsStr::new(&pair.comment),
            OsStr::new("-N"),
            OsStr::new(""),
            OsStr::new("-f"),
            pair.private.as_os_str(),
        ];
        client::output("ssh-keygen", &args)?;
        Ok(())
    }

    fn derive_public(&self, private: &Path) -> anyhow::Result<String> {
        let args = [OsStr::new("-y"), OsStr::new("-f"), private.as_os_str()];
        client::output("ssh-keygen", &args)
    }
}

/// Ensures `~/.ssh` exists with mode 0700.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshDirStep {
    dir: PathBuf,
}

impl SshDirStep {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SshDirStep { dir: dir.into() }
    }
}

impl Step for SshDirStep {
    fn name(&self) -> &str {
        "ssh directory"
    }

    fn check(&self) -> anyhow::Result<bool> {
        match fs::metadata(&self.dir) {
            Ok(md) => Ok(md.is_dir() && mode(&md) == DIR_MODE),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("could not inspect {}", self.dir.display()))
            }
        }
    }

    fn apply(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("could not create {}", self.dir.display()))?;
        set_mode(&self.dir, DIR_MODE)
    }
}

/// Ensures the key pair exists.
///
/// If only the private key exists, the public key is derived from it rather than generating a
/// new pair. When forced, both files are removed and a new pair is generated.
pub struct KeyPairStep<'a> {
    pair: KeyPair,
    tool: &'a dyn KeyTool,
}

impl<'a> KeyPairStep<'a> {
    pub fn new(pair: KeyPair, tool: &'a dyn KeyTool) -> Self {
        KeyPairStep { pair, tool }
    }
}

impl Step for KeyPairStep<'_> {
    fn name(&self) -> &str {
        "key pair"
    }

    fn forceable(&self) -> bool {
        true
    }

    fn check(&self) -> anyhow::Result<bool> {
        Ok(exists(&self.pair.private)? && exists(&self.pair.public)?)
    }

    fn reset(&self) -> anyhow::Result<()> {
        remove_if_present(&self.pair.private)?;
        remove_if_present(&self.pair.public)
    }

    fn apply(&self) -> anyhow::Result<()> {
        if exists(&self.pair.private)? {
            tracing::info!(key = %self.pair.private.display(), "deriving missing public key");
            let public = self.tool.derive_public(&self.pair.private)?;
            fs::write(&self.pair.public, format!("{}\n", public.trim_end()))
                .with_context(|| format!("could not write {}", self.pair.public.display()))?;
            return set_mode(&self.pair.public, PUBLIC_MODE);
        }

        // ssh-keygen refuses to overwrite without asking, and a stale public key would no longer
        // match the new private key.
        remove_if_present(&self.pair.public)?;
        tracing::info!(key = %self.pair.private.display(), "generating key pair");
        self.tool.generate(&self.pair)
    }
}

/// Ensures the private key has mode 0600 and the public key 0644.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyModeStep {
    pair: KeyPair,
}

impl KeyModeStep {
    pub fn new(pair: KeyPair) -> Self {
        KeyModeStep { pair }
    }
}

impl Step for KeyModeStep {
    fn name(&self) -> &str {
        "key permissions"
    }

    fn check(&self) -> anyhow::Result<bool> {
        Ok(has_mode(&self.pair.private, PRIVATE_MODE)?
            && has_mode(&self.pair.public, PUBLIC_MODE)?)
    }

    fn apply(&self) -> anyhow::Result<()> {
        set_mode(&self.pair.private, PRIVATE_MODE)?;
        set_mode(&self.pair.public, PUBLIC_MODE)
    }
}

fn mode(md: &fs::Metadata) -> u32 {
    md.permissions().mode() & 0o777
}

/// Returns whether `path` exists with exactly `expected` permission bits. A missing file does
/// not.
pub fn has_mode(path: &Path, expected: u32) -> anyhow::Result<bool> {
    match fs::metadata(path) {
        Ok(md) => Ok(mode(&md) == expected),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("could not inspect {}", path.display())),
    }
}

pub fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode))
        .with_context(|| format!("could not set mode {mode:o} on {}", path.display()))
}

fn exists(path: &Path) -> anyhow::Result<bool> {
    path.try_exists()
        .with_context(|| format!("could not determine whether {} exists", path.display()))
}

fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("could not remove {}", path.display())),
    }
}

#[cfg(test)]
mod test;
