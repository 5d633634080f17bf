//! Settings shared by every step of a run.
//!
//! Identity (user, host, home directory) and privilege decisions are read from the environment
//! exactly once, in [Settings::from_environment], and then passed explicitly to whatever needs
//! them.

use crate::cli::{KeyArgs, SetupArgs};
use anyhow::{anyhow, Context};
use std::path::PathBuf;

/// The user's SSH directory, relative to their home directory.
const SSH_DIR: &str = ".ssh";

/// File name of the private key that Homestead manages inside [SSH_DIR].
pub const KEY_NAME: &str = "id_ed25519";

/// File name of the OpenSSH client configuration inside [SSH_DIR].
pub const SSH_CONFIG: &str = "config";

/// The built-in workstation manifest, used when `homestead` is run without `--manifest`.
pub const DEFAULT_MANIFEST: &str = include_str!("../resources/workstation.yaml");

/// Configuration for a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// The user's home directory.
    pub home: PathBuf,

    /// The login name of the user running Homestead.
    pub user: String,

    /// Comment embedded in a newly generated key, conventionally an e-mail address.
    pub email: String,

    /// Regenerate the key pair even if one already exists.
    pub force: bool,

    /// Register the key with `ssh-agent`.
    pub agent: bool,

    /// Copy the public key to the clipboard.
    pub copy: bool,

    /// Prefix privileged commands (package installation) with `sudo`.
    pub sudo: bool,
}

impl Settings {
    /// Reads the user's identity and home directory from the environment.
    ///
    /// The e-mail defaults to `<user>@<hostname>`. Agent registration and clipboard copy are
    /// enabled; force is disabled.
    pub fn from_environment() -> anyhow::Result<Self> {
        let home =
            home::home_dir().ok_or_else(|| anyhow!("could not determine the home directory"))?;
        let user = whoami::username();
        let host = hostname::get()
            .context("could not determine the host name")?
            .to_string_lossy()
            .into_owned();

        Ok(Settings {
            email: default_email(&user, &host),
            sudo: user != "root",
            home,
            user,
            force: false,
            agent: true,
            copy: true,
        })
    }

    /// Builds settings for an arbitrary home directory. Nothing is read from the environment.
    pub fn for_home(
        home: impl Into<PathBuf>,
        user: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let user = user.into();
        Settings {
            home: home.into(),
            email: email.into(),
            sudo: user != "root",
            user,
            force: false,
            agent: true,
            copy: true,
        }
    }

    /// Applies the options given to `homestead-keys`.
    pub fn with_key_args(mut self, args: &KeyArgs) -> Self {
        if let Some(email) = &args.email {
            self.email = email.clone();
        }
        self.force = args.force;
        self.agent = !args.no_agent;
        self.copy = !args.no_copy;
        self
    }

    /// Applies the options given to `homestead`.
    ///
    /// Machine setup never forces key regeneration; agent and clipboard behavior is decided per
    /// manifest task.
    pub fn with_setup_args(mut self, args: &SetupArgs) -> Self {
        if let Some(email) = &args.email {
            self.email = email.clone();
        }
        self.force = false;
        self
    }

    /// `~/.ssh`
    pub fn ssh_dir(&self) -> PathBuf {
        self.home.join(SSH_DIR)
    }

    /// `~/.ssh/config`
    pub fn ssh_config(&self) -> PathBuf {
        self.ssh_dir().join(SSH_CONFIG)
    }

    /// `~/.ssh/id_ed25519`
    pub fn private_key(&self) -> PathBuf {
        self.ssh_dir().join(KEY_NAME)
    }
}

/// Builds the default key comment from a user name and a host name.
pub fn default_email(user: &str, host: &str) -> String {
    format!("{user}@{host}")
}
