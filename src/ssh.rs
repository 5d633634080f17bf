//! SSH key management: the steps behind `homestead-keys` and the `ssh_keys` manifest action.
//!
//! The flow, in order:
//!
//! 1. `~/.ssh` exists with mode 0700.
//! 2. An ed25519 key pair exists (generated, or the public half derived from the private one).
//! 3. The key files have modes 0600 and 0644.
//! 4. `~/.ssh/config` carries the required wildcard directives, see [config::merge].
//! 5. Optionally, the key is registered with `ssh-agent` (best effort).
//! 6. Optionally, the public key is copied to the clipboard (best effort).
//!
//! The external programs involved sit behind the [KeyTool], [Agent], and [Clipboard] traits so
//! that the flow can run against fakes.

pub mod agent;
pub mod clipboard;
pub mod config;
pub mod keys;

use crate::config::Settings;
use crate::core::Plan;
use crate::run_plan::report::Report;
use crate::run_plan::Runner;
pub use agent::{Agent, AgentStep, SshAgent};
pub use clipboard::{Clipboard, ClipboardStep, SystemClipboard};
pub use config::ConfigStep;
pub use keys::{KeyModeStep, KeyPair, KeyPairStep, KeyTool, SshDirStep, SshKeygen};

/// The collaborators the SSH steps call out to.
pub struct Toolbox {
    pub keygen: Box<dyn KeyTool>,
    pub agent: Box<dyn Agent>,
    pub clipboard: Box<dyn Clipboard>,
}

impl Toolbox {
    /// The real programs: `ssh-keygen`, `ssh-agent`/`ssh-add`, and a clipboard utility.
    pub fn system() -> Self {
        Toolbox {
            keygen: Box::new(SshKeygen),
            agent: Box::new(SshAgent::new()),
            clipboard: Box::new(SystemClipboard),
        }
    }
}

/// The key pair managed for `settings`.
pub fn key_pair(settings: &Settings) -> KeyPair {
    KeyPair::new(settings.private_key(), settings.email.clone())
}

/// Builds the ordered key-setup steps.
///
/// Agent registration and clipboard copy are included only when `agent` and `copy` are set.
pub fn key_steps<'a>(settings: &Settings, agent: bool, copy: bool, tools: &'a Toolbox) -> Plan<'a> {
    let pair = key_pair(settings);
    let mut plan = Plan::new();
    plan.push(SshDirStep::new(settings.ssh_dir()));
    plan.push(KeyPairStep::new(pair.clone(), tools.keygen.as_ref()));
    plan.push(KeyModeStep::new(pair.clone()));
    plan.push(ConfigStep::new(settings.ssh_config()));
    if agent {
        plan.push(AgentStep::new(pair.clone(), tools.agent.as_ref()));
    }
    if copy {
        plan.push(ClipboardStep::new(pair, tools.clipboard.as_ref()));
    }
    plan
}

/// Reads the public key for `settings`, without a trailing newline.
pub fn public_key_text(settings: &Settings) -> anyhow::Result<String> {
    key_pair(settings).public_key()
}

/// Runs the whole key flow, then prints the public key.
///
/// The public key is printed whether or not the best-effort steps succeeded. Returns it as well.
pub fn run_key_setup<R: Report>(
    settings: &Settings,
    tools: &Toolbox,
    runner: &mut Runner<R>,
) -> anyhow::Result<String> {
    let plan = key_steps(settings, settings.agent, settings.copy, tools);
    runner.run_plan(&plan)?;
    let public = public_key_text(settings)?;
    runner.note(&public)?;
    Ok(public)
}


#[cfg(test)]
mod tests {
    use super::fixtures::fake_toolbox;
    use super::*;
    use crate::run_plan::report::Buffered;
    use tempfile::TempDir;

    fn settings(home: &TempDir) -> Settings {
        Settings::for_home(home.path(), "archie", "test@example.com")
    }

    #[test]
    fn optional_steps_follow_flags() {
        let home = TempDir::new().unwrap();
        let tools = fake_toolbox();
        let settings = settings(&home);

        let all = key_steps(&settings, true, true, &tools);
        assert_eq!(
            vec![
                "ssh directory",
                "key pair",
                "key permissions",
                "ssh config",
                "ssh agent",
                "copy public key",
            ],
            all.names(),
        );
        assert_eq!(4, key_steps(&settings, false, false, &tools).len());
    }

    #[test]
    fn prints_public_key_last() {
        let home = TempDir::new().unwrap();
        let tools = fake_toolbox();
        let mut settings = settings(&home);
        settings.agent = false;
        settings.copy = false;

        let mut runner = Runner::new(Buffered::new(), false);
        let public = run_key_setup(&settings, &tools, &mut runner).unwrap();
        assert_eq!("ssh-ed25519 KEY1 test@example.com", public);

        let stdout = runner.into_reporter().stdout();
        assert_eq!(
            "[applied] ssh directory\n\
             [applied] key pair\n\
             [skipped] key permissions\n\
             [applied] ssh config\n\
             ssh-ed25519 KEY1 test@example.com\n",
            stdout,
        );
    }
}
