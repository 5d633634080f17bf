//! Verifies (de)serialization of Manifest, Task, and Action values to/from YAML.
//!
//! Actions are not tested on their own here; they are used in the context of Manifests and
//! Tasks, which is how users write them.

use homestead::core::*;
use indexmap::IndexMap;

/// Parses `yaml` as a [Manifest] and asserts that it equals `expected`.
fn assert_de(yaml: &str, expected: Manifest) {
    assert_eq!(expected, Manifest::from_yaml(yaml).unwrap());
}

fn manifest(tasks: Vec<Task>) -> Manifest {
    Manifest {
        source: None,
        name: "workstation".to_owned(),
        vars: IndexMap::new(),
        tasks,
    }
}

fn task(name: &str, action: Action) -> Task {
    Task {
        name: name.to_owned(),
        class: Class::Required,
        action,
    }
}

mod manifest {
    use super::*;

    #[test]
    fn minimal() {
        assert_de("name: workstation\ntasks: []\n", manifest(vec![]));
    }

    #[test]
    fn vars_keep_their_order() {
        let yaml = "\
name: workstation
vars:
  zeta: last
  alpha: first
  mid: $alpha
tasks: []
";
        let mut expected = manifest(vec![]);
        expected.vars.insert("zeta".to_owned(), "last".to_owned());
        expected.vars.insert("alpha".to_owned(), "first".to_owned());
        expected.vars.insert("mid".to_owned(), "$alpha".to_owned());

        let parsed = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(expected, parsed);
        assert_eq!(
            vec!["zeta", "alpha", "mid"],
            parsed.vars.keys().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn missing_tasks_is_an_error() {
        assert!(Manifest::from_yaml("name: workstation\n").is_err());
    }

    #[test]
    fn serializes_without_empty_vars() {
        let manifest = manifest(vec![task(
            "Base packages",
            Action::Packages(vec!["zsh".to_owned(), "git".to_owned()]),
        )]);
        assert_eq!(
            "\
name: workstation
tasks:
- name: Base packages
  action:
    packages:
    - zsh
    - git
",
            serde_yaml::to_string(&manifest).unwrap(),
        );
    }
}

mod task {
    use super::*;

    #[test]
    fn class_defaults_to_required() {
        let yaml = "\
name: workstation
tasks:
  - name: Shell
    action:
      packages: [zsh]
  - name: Clipboard
    class: best_effort
    action:
      packages: [xclip]
";
        let mut clipboard = task("Clipboard", Action::Packages(vec!["xclip".to_owned()]));
        clipboard.class = Class::BestEffort;
        assert_de(
            yaml,
            manifest(vec![
                task("Shell", Action::Packages(vec!["zsh".to_owned()])),
                clipboard,
            ]),
        );
    }

    #[test]
    fn unknown_class_is_an_error() {
        let yaml = "\
name: workstation
tasks:
  - name: Shell
    class: optional
    action:
      packages: [zsh]
";
        assert!(Manifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn serializes_best_effort_class() {
        let mut task = task(
            "Fonts",
            Action::Command {
                run: vec!["fc-cache -f".to_owned()],
                creates: None,
                unless: None,
            },
        );
        task.class = Class::BestEffort;
        assert_eq!(
            "\
name: Fonts
class: best_effort
action:
  command:
    run:
    - fc-cache -f
",
            serde_yaml::to_string(&task).unwrap(),
        );
    }
}

mod action {
    use super::*;

    fn single(action_yaml: &str) -> anyhow::Result<Action> {
        let indented: String = action_yaml
            .lines()
            .map(|line| format!("      {line}\n"))
            .collect();
        let yaml = format!("name: workstation\ntasks:\n  - name: Only\n    action:\n{indented}");
        let mut manifest = Manifest::from_yaml(&yaml)?;
        Ok(manifest.tasks.remove(0).action)
    }

    #[test]
    fn clone() {
        assert_eq!(
            Action::GitClone {
                repo: "https://github.com/ohmyzsh/ohmyzsh.git".to_owned(),
                dest: "~/.oh-my-zsh".to_owned(),
            },
            single("clone:\n  repo: https://github.com/ohmyzsh/ohmyzsh.git\n  dest: ~/.oh-my-zsh")
                .unwrap(),
        );
    }

    #[test]
    fn download() {
        assert_eq!(
            Action::Download {
                url: "https://example.com/font.zip".to_owned(),
                dest: "$src/font.zip".to_owned(),
            },
            single("download:\n  url: https://example.com/font.zip\n  dest: $src/font.zip")
                .unwrap(),
        );
    }

    #[test]
    fn line_in_file_defaults() {
        assert_eq!(
            Action::LineInFile {
                path: "$home/.zshrc".to_owned(),
                line: "export EDITOR=nvim".to_owned(),
                pattern: None,
                after: None,
                indent: false,
            },
            single("line_in_file:\n  path: $home/.zshrc\n  line: export EDITOR=nvim").unwrap(),
        );
    }

    #[test]
    fn line_in_file_everything() {
        assert_eq!(
            Action::LineInFile {
                path: "/etc/ssh/sshd_config".to_owned(),
                line: "PasswordAuthentication no".to_owned(),
                pattern: Some("PasswordAuthentication".to_owned()),
                after: Some("# Authentication".to_owned()),
                indent: true,
            },
            single(
                "line_in_file:\n  path: /etc/ssh/sshd_config\n  line: PasswordAuthentication no\n  \
                 pattern: PasswordAuthentication\n  after: \"# Authentication\"\n  indent: true"
            )
            .unwrap(),
        );
    }

    #[test]
    fn command_with_guards() {
        assert_eq!(
            Action::Command {
                run: vec!["make".to_owned(), "make install".to_owned()],
                creates: Some("$home/.local/bin/nvim".to_owned()),
                unless: Some("command -v nvim".to_owned()),
            },
            single(
                "command:\n  run: [make, make install]\n  creates: $home/.local/bin/nvim\n  \
                 unless: command -v nvim"
            )
            .unwrap(),
        );
    }

    #[test]
    fn ssh_keys_defaults() {
        assert_eq!(
            Action::SshKeys {
                agent: true,
                copy: false,
            },
            single("ssh_keys: {}").unwrap(),
        );
        assert_eq!(
            Action::SshKeys {
                agent: false,
                copy: true,
            },
            single("ssh_keys:\n  agent: false\n  copy: true").unwrap(),
        );
    }

    #[test]
    fn unknown_action_is_an_error() {
        assert!(single("upload:\n  from: a\n  to: b").is_err());
    }

    #[test]
    fn missing_field_is_an_error() {
        assert!(single("clone:\n  repo: https://example.com/x.git").is_err());
    }
}

mod builtin {
    use super::*;

    #[test]
    fn parses_and_ends_with_ssh_keys() {
        let manifest = Manifest::builtin().unwrap();
        assert_eq!("workstation", manifest.name);
        assert!(manifest.source.is_none());
        assert!(matches!(
            manifest.tasks.last().map(|task| &task.action),
            Some(Action::SshKeys {
                agent: true,
                copy: false
            }),
        ));
    }
}
