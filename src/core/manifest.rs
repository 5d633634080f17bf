//! Types for representing machine-setup manifest files.

use crate::config::{Settings, DEFAULT_MANIFEST};
use crate::core::action::{Action, ActionStep};
use crate::core::plan::Plan;
use crate::core::task::Task;
use crate::ssh::{self, Toolbox};
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents a manifest file: an ordered list of [Task]s that provision a machine.
///
/// This type is typically parsed from YAML, but it can be constructed programmatically as well.
///
/// ```yaml
/// name: workstation
/// vars:
///   fonts: $home/.local/share/fonts
/// tasks:
///   - name: Base packages
///     action:
///       packages: [zsh, git, curl]
///   - name: SSH keys
///     action:
///       ssh_keys: {}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
    /// The file from which this value was parsed (if any).
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// The [Manifest]'s name. Used for informational, logging, and debugging purposes.
    pub name: String,

    /// Variables substituted into every task's [Action].
    ///
    /// Order is preserved from the source file and determines substitution order.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub vars: IndexMap<String, String>,

    /// The tasks to run, in order.
    pub tasks: Vec<Task>,
}

impl Manifest {
    /// Parses a manifest from YAML text.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a manifest file and records its path in [Manifest::source].
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("could not read manifest {}", path.display()))?;
        let mut manifest = Self::from_yaml(&yaml)
            .with_context(|| format!("could not parse manifest {}", path.display()))?;
        manifest.source = Some(path.to_owned());
        Ok(manifest)
    }

    /// The workstation manifest compiled into the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_yaml(DEFAULT_MANIFEST).context("could not parse the built-in manifest")
    }

    /// Whether any task installs packages, and so needs a package manager.
    pub fn needs_package_manager(&self) -> bool {
        self.tasks
            .iter()
            .any(|task| matches!(task.action, Action::Packages(_)))
    }

    /// The variables in effect for a run with `settings`.
    ///
    /// The manifest's own variables come first, followed by the built-ins `home`, `user`,
    /// `email`, and `sudo`. Because substitution follows this order, a manifest variable may refer
    /// to a built-in (`fonts: $home/.fonts`). A manifest variable with a built-in's name replaces
    /// it.
    ///
    /// `sudo` is `sudo` when [Settings::sudo] is set and empty otherwise, so a privileged command
    /// is written `$sudo chsh ...`.
    pub fn vars_for(&self, settings: &Settings) -> IndexMap<String, String> {
        let mut vars = self.vars.clone();
        let builtins = [
            ("home", settings.home.to_string_lossy().into_owned()),
            ("user", settings.user.clone()),
            ("email", settings.email.clone()),
            ("sudo", if settings.sudo { "sudo" } else { "" }.to_string()),
        ];
        for (name, value) in builtins {
            vars.entry(name.to_string()).or_insert(value);
        }
        vars
    }

    /// Compiles every task into a [Plan] of steps.
    ///
    /// [Action::SshKeys] expands into the same steps `homestead-keys` runs, see
    /// [ssh::key_steps].
    pub fn plan<'a>(&self, settings: &Settings, tools: &'a Toolbox) -> anyhow::Result<Plan<'a>> {
        let vars = self.vars_for(settings);
        let mut plan = Plan::new();

        for task in &self.tasks {
            let action = task
                .action
                .compile(&vars)
                .with_context(|| format!("could not compile task \"{}\"", task.name))?;
            tracing::debug!(task = %task.name, action = %action.title(), "compiled");

            match action {
                Action::SshKeys { agent, copy } => {
                    plan.append(ssh::key_steps(settings, agent, copy, tools));
                }
                action => plan.push(ActionStep::new(
                    task.name.clone(),
                    task.class,
                    action,
                    &settings.home,
                    settings.sudo,
                )?),
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::Class;

    fn settings() -> Settings {
        Settings::for_home("/home/archie", "archie", "archie@zen3")
    }

    #[test]
    fn builtin_manifest_parses() {
        let manifest = Manifest::builtin().unwrap();
        assert!(!manifest.tasks.is_empty());
        assert!(manifest.needs_package_manager());
        assert!(manifest
            .tasks
            .iter()
            .any(|task| matches!(task.action, Action::SshKeys { .. })));
    }

    #[test]
    fn builtin_manifest_compiles() {
        let manifest = Manifest::builtin().unwrap();
        let tools = Toolbox::system();
        let plan = manifest.plan(&settings(), &tools).unwrap();
        assert!(plan.len() >= manifest.tasks.len());
    }

    #[test]
    fn vars_put_builtins_last() {
        let mut manifest = Manifest {
            source: None,
            name: "vars".into(),
            vars: IndexMap::new(),
            tasks: vec![],
        };
        manifest
            .vars
            .insert("fonts".into(), "$home/.local/share/fonts".into());
        manifest.vars.insert("user".into(), "override".into());

        let vars = manifest.vars_for(&settings());
        let keys: Vec<&str> = vars.keys().map(String::as_str).collect();
        assert_eq!(vec!["fonts", "user", "home", "email", "sudo"], keys);
        assert_eq!("override", vars["user"]);
        assert_eq!("/home/archie", vars["home"]);
    }

    #[test]
    fn sudo_is_empty_for_root() {
        let manifest = Manifest::builtin().unwrap();
        let chsh = |settings: &Settings| {
            let vars = manifest.vars_for(settings);
            let task = manifest
                .tasks
                .iter()
                .find(|task| task.name == "Default shell")
                .unwrap();
            match task.action.compile(&vars).unwrap() {
                Action::Command { mut run, .. } => run.remove(0),
                a => panic!("unexpected action: {a:?}"),
            }
        };

        let root = Settings::for_home("/root", "root", "root@zen3");
        assert_eq!(" chsh -s /usr/bin/zsh root", chsh(&root));
        assert_eq!("sudo chsh -s /usr/bin/zsh archie", chsh(&settings()));
    }

    #[test]
    fn manifest_vars_may_refer_to_builtins() {
        let manifest = Manifest::from_yaml(
            r#"
name: fonts
vars:
  fonts: $home/.local/share/fonts
tasks:
  - name: Font directory
    action:
      command:
        run: ["mkdir -p $fonts"]
"#,
        )
        .unwrap();
        let vars = manifest.vars_for(&settings());
        let compiled = manifest.tasks[0].action.compile(&vars).unwrap();
        assert_eq!(
            Action::Command {
                run: vec!["mkdir -p /home/archie/.local/share/fonts".into()],
                creates: None,
                unless: None,
            },
            compiled,
        );
    }

    #[test]
    fn ssh_keys_expands_into_key_steps() {
        let manifest = Manifest::from_yaml(
            r#"
name: keys
tasks:
  - name: Shell
    class: best_effort
    action:
      command:
        run: ["true"]
  - name: SSH keys
    action:
      ssh_keys:
        agent: false
"#,
        )
        .unwrap();
        assert_eq!(Class::BestEffort, manifest.tasks[0].class);
        assert!(!manifest.needs_package_manager());

        let tools = Toolbox::system();
        let plan = manifest.plan(&settings(), &tools).unwrap();
        assert_eq!(
            vec!["Shell", "ssh directory", "key pair", "key permissions", "ssh config"],
            plan.names(),
        );
    }

    #[test]
    fn load_records_source() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("m.yaml");
        fs::write(&path, "name: empty\ntasks: []\n")?;
        let manifest = Manifest::load(&path)?;
        assert_eq!(Some(path), manifest.source);
        assert_eq!("empty", manifest.name);
        Ok(())
    }

    #[test]
    fn load_names_the_file_on_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "name: [").unwrap();
        let error = Manifest::load(&path).unwrap_err();
        assert!(format!("{error:#}").contains("broken.yaml"));
    }
}
