//! Registers the key with `ssh-agent`.

use super::keys::{key_body, KeyPair};
use crate::client;
use crate::core::{Class, Step};
use anyhow::{anyhow, bail};
use regex::Regex;
use std::cell::RefCell;
use std::path::Path;
use std::process::Command;

/// Talks to an SSH agent.
pub trait Agent {
    /// Lists the public keys the agent holds, one OpenSSH line each. An unreachable agent holds
    /// nothing.
    fn identities(&self) -> anyhow::Result<Vec<String>>;

    /// Adds a private key, starting an agent first if none is reachable.
    fn add(&self, private: &Path) -> anyhow::Result<()>;
}

/// Connection details of an agent this process started.
#[derive(Clone, Debug, PartialEq, Eq)]
struct AgentEnv {
    sock: String,
    pid: String,
}

/// The real [Agent], backed by `ssh-add` and, if needed, `ssh-agent`.
#[derive(Debug, Default)]
pub struct SshAgent {
    started: RefCell<Option<AgentEnv>>,
}

impl SshAgent {
    pub fn new() -> Self {
        Self::default()
    }

    fn ssh_add(&self) -> Command {
        let mut command = Command::new("ssh-add");
        if let Some(env) = &*self.started.borrow() {
            command
                .env("SSH_AUTH_SOCK", &env.sock)
                .env("SSH_AGENT_PID", &env.pid);
        }
        command
    }

    /// `ssh-add -l` exits with 2 when it cannot reach an agent.
    fn reachable(&self) -> anyhow::Result<bool> {
        let output = client::capture(self.ssh_add().arg("-l"))?;
        Ok(output.status.code() != Some(2))
    }

    fn start(&self) -> anyhow::Result<()> {
        let script = client::output("ssh-agent", &["-s"])?;
        let env = parse_agent_env(&script)?;
        tracing::info!(sock = %env.sock, pid = %env.pid, "started ssh-agent");
        *self.started.borrow_mut() = Some(env);
        Ok(())
    }
}

impl Agent for SshAgent {
    fn identities(&self) -> anyhow::Result<Vec<String>> {
        if client::which("ssh-add").is_none() {
            bail!("ssh-add was not found on PATH");
        }
        let output = client::capture(self.ssh_add().arg("-L"))?;
        if !output.status.success() {
            // 1: the agent holds no keys. 2: there is no agent.
            tracing::debug!(status = ?output.status.code(), "agent listed no identities");
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn add(&self, private: &Path) -> anyhow::Result<()> {
        if !self.reachable()? {
            self.start()?;
        }
        let output = client::capture(self.ssh_add().arg(private))?;
        if !output.status.success() {
            bail!(
                "ssh-add could not add {}: {}",
                private.display(),
                String::from_utf8_lossy(&output.stderr).trim(),
            );
        }
        Ok(())
    }
}

/// Reads `SSH_AUTH_SOCK` and `SSH_AGENT_PID` from the Bourne shell script `ssh-agent -s` prints.
fn parse_agent_env(script: &str) -> anyhow::Result<AgentEnv> {
    let find = |name: &str| -> anyhow::Result<String> {
        let re = Regex::new(&format!(r"{name}=([^;\s]+)"))?;
        re.captures(script)
            .map(|c| c[1].to_string())
            .ok_or_else(|| anyhow!("ssh-agent did not report {name}"))
    };
    Ok(AgentEnv {
        sock: find("SSH_AUTH_SOCK")?,
        pid: find("SSH_AGENT_PID")?,
    })
}

/// Ensures the agent holds the key. Best effort.
pub struct AgentStep<'a> {
    pair: KeyPair,
    agent: &'a dyn Agent,
}

impl<'a> AgentStep<'a> {
    pub fn new(pair: KeyPair, agent: &'a dyn Agent) -> Self {
        AgentStep { pair, agent }
    }
}

impl Step for AgentStep<'_> {
    fn name(&self) -> &str {
        "ssh agent"
    }

    fn class(&self) -> Class {
        Class::BestEffort
    }

    fn check(&self) -> anyhow::Result<bool> {
        let public = self.pair.public_key()?;
        let body = key_body(&public)
            .ok_or_else(|| anyhow!("{} is not a public key", self.pair.public.display()))?;
        Ok(self
            .agent
            .identities()?
            .iter()
            .any(|identity| key_body(identity) == Some(body)))
    }

    fn apply(&self) -> anyhow::Result<()> {
        self.agent.add(&self.pair.private)
    }
}
