use super::*;
use std::io;

mod run {
    use super::*;

    #[test]
    fn empty_cmd_or_failure_to_start() {
        let error = run("", &["a", "b", "c"]).unwrap_err();
        assert!(error
            .to_string()
            .contains("failed to start command: '' a b c"));
        let error: io::Error = error.downcast().unwrap();
        assert_eq!(io::ErrorKind::NotFound, error.kind());
    }

    #[test]
    fn exit_failure() {
        let error = run("sh", &["-c", "exit 3"]).unwrap_err();
        assert!(error
            .to_string()
            .contains("command exited with exit code 3: sh -c 'exit 3'"));
    }

    #[test]
    fn exit_success() -> anyhow::Result<()> {
        run("sh", &["-c", "true"])
    }
}

mod output {
    use super::*;

    #[test]
    fn returns_stdout() -> anyhow::Result<()> {
        assert_eq!("hello\n", output("sh", &["-c", "echo hello"])?);
        Ok(())
    }

    #[test]
    fn failure_includes_stderr() {
        let error = output("sh", &["-c", "echo oops >&2; exit 1"]).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("exit code 1"), "{message}");
        assert!(message.contains("oops"), "{message}");
    }
}

mod succeeds {
    use super::*;

    #[test]
    fn reports_exit_status() -> anyhow::Result<()> {
        assert!(succeeds("sh", &["-c", "true"])?);
        assert!(!succeeds("sh", &["-c", "false"])?);
        Ok(())
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(succeeds("homestead-no-such-program", &[] as &[&str]).is_err());
    }
}

mod pipe {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn writes_stdin() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("piped");
        let script = format!("cat > '{}'", target.display());
        pipe("sh", &["-c", &script], b"ssh-ed25519 AAAA test\n")?;
        assert_eq!("ssh-ed25519 AAAA test\n", fs::read_to_string(target)?);
        Ok(())
    }

    #[test]
    fn does_not_wait_for_background_children() -> anyhow::Result<()> {
        let start = Instant::now();
        pipe("sh", &["-c", "cat >/dev/null; sleep 5 & exit 0"], b"key\n")?;
        assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());
        Ok(())
    }

    #[test]
    fn exit_failure() {
        let error = pipe("sh", &["-c", "cat >/dev/null; exit 2"], b"key\n").unwrap_err();
        assert!(error.to_string().contains("exit code 2"));
    }
}

mod which {
    use super::*;

    #[test]
    fn finds_sh() {
        assert!(which("sh").is_some());
    }

    #[test]
    fn misses_nonexistent() {
        assert!(which("homestead-no-such-program").is_none());
    }
}

mod privileged {
    use super::*;

    #[test]
    fn prefixes_sudo() {
        let (program, args) = privileged(true, "apt-get", &["install", "-y", "zsh"]);
        assert_eq!("sudo", program);
        assert_eq!(vec!["apt-get", "install", "-y", "zsh"], args);
    }

    #[test]
    fn runs_directly_as_root() {
        let (program, args) = privileged(false, "apt-get", &["install"]);
        assert_eq!("apt-get", program);
        assert_eq!(vec!["install"], args);
    }
}

#[test]
fn describe_quotes_arguments() {
    let mut command = Command::new("ssh-keygen");
    command.args(["-C", "archie", "-N", ""]);
    assert_eq!("ssh-keygen -C archie -N ''", describe(&command));
}
