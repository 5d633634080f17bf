//! Runs the external programs that Homestead delegates to.
//!
//! Key generation, package installation, cloning, and the like are all done by invoking system
//! utilities. The helpers here start a process, wait for it, and turn a failed exit status into
//! an error that names the command the way the user would type it.

use anyhow::{bail, Context};
use shlex::Quoter;
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output, Stdio};

/// Runs a command as a new process and waits for it to complete.
///
/// Standard input, output, and error are inherited from the parent process.
///
/// # Errors
///
/// Returns an error if the command cannot be started or exits unsuccessfully.
pub fn run<C: AsRef<OsStr>, A: AsRef<OsStr>>(cmd: C, args: &[A]) -> anyhow::Result<()> {
    let mut command = Command::new(&cmd);
    command.args(args);
    let status = status(&mut command)?;
    check(&command, status, None)
}

/// Runs a command and returns its standard output as a [String].
///
/// Standard error is captured and included in the error message if the command fails.
pub fn output<C: AsRef<OsStr>, A: AsRef<OsStr>>(cmd: C, args: &[A]) -> anyhow::Result<String> {
    let mut command = Command::new(&cmd);
    command.args(args);
    let output = capture(&mut command)?;
    check(&command, output.status, Some(&output.stderr))?;
    String::from_utf8(output.stdout)
        .with_context(|| format!("output of `{}` was not UTF-8", describe(&command)))
}

/// Runs a command and reports whether it exited successfully. All output is discarded.
///
/// A command that runs and fails is `Ok(false)`. Only failing to start the command is an error.
pub fn succeeds<C: AsRef<OsStr>, A: AsRef<OsStr>>(cmd: C, args: &[A]) -> anyhow::Result<bool> {
    let mut command = Command::new(&cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    Ok(status(&mut command)?.success())
}

/// Runs a command with `input` written to its standard input.
///
/// Output is discarded, and only the command's own exit is waited for. Clipboard utilities leave
/// a child behind that holds the selection and any inherited streams.
pub fn pipe<C: AsRef<OsStr>, A: AsRef<OsStr>>(
    cmd: C,
    args: &[A],
    input: &[u8],
) -> anyhow::Result<()> {
    let mut command = Command::new(&cmd);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    tracing::debug!(command = %describe(&command), "spawning");

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start command: {}", describe(&command)))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .with_context(|| format!("failed to write to command: {}", describe(&command)))?;
        // Dropping stdin closes it, so the command sees end of input.
    }
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for command: {}", describe(&command)))?;
    check(&command, status, None)
}

/// Runs a prepared [Command] and returns its captured [Output] without judging its exit status.
pub fn capture(command: &mut Command) -> anyhow::Result<Output> {
    tracing::debug!(command = %describe(command), "spawning");
    command
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to start command: {}", describe(command)))
}

/// Searches `PATH` for an executable named `program`.
pub fn which(program: impl AsRef<OsStr>) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program.as_ref()))
        .find(|candidate| is_executable(candidate))
}

/// Builds a user-friendly, shell-quoted representation of a [Command] for messages.
pub fn describe(command: &Command) -> String {
    let mut components: Vec<String> = Vec::with_capacity(command.get_args().len() + 1);
    components.push(command.get_program().to_string_lossy().to_string());
    components.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));

    // Quoting fails on strings shlex cannot represent, e.g. ones with NUL bytes. Fall back to
    // joining with spaces; this is only used for messages.
    match Quoter::new().join(components.iter().map(|s| &s[..])) {
        Ok(s) => s,
        Err(_) => components.join(" "),
    }
}

/// Prefixes a privileged command with `sudo` when `sudo` is true.
///
/// Returns the program to run and its full argument list.
pub fn privileged<A: AsRef<OsStr>>(sudo: bool, cmd: &str, args: &[A]) -> (OsString, Vec<OsString>) {
    let args = args.iter().map(|a| a.as_ref().to_owned());
    if sudo {
        let mut full = vec![OsString::from(cmd)];
        full.extend(args);
        (OsString::from("sudo"), full)
    } else {
        (OsString::from(cmd), args.collect())
    }
}

fn status(command: &mut Command) -> anyhow::Result<ExitStatus> {
    tracing::debug!(command = %describe(command), "spawning");
    command
        .status()
        .with_context(|| format!("failed to start command: {}", describe(command)))
}

fn check(command: &Command, status: ExitStatus, stderr: Option<&[u8]>) -> anyhow::Result<()> {
    if status.success() {
        return Ok(());
    }
    let error = match status.code() {
        Some(i) => format!("exit code {i}"),
        None => "error".to_string(),
    };
    match stderr.map(String::from_utf8_lossy) {
        Some(stderr) if !stderr.trim().is_empty() => bail!(
            "command exited with {error}: {}\n{}",
            describe(command),
            stderr.trim_end(),
        ),
        _ => bail!("command exited with {error}: {}", describe(command)),
    }
}

fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(md) => md.is_file() && md.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod test;
