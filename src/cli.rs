//! Command-line parsing for the `homestead` and `homestead-keys` binaries.
//!
//! Both binaries accept a handful of long options, so the parsing is done by hand. Any argument
//! that is not recognized is a usage error; the binaries print the error and the help text and
//! exit with status 1.

use std::path::PathBuf;
use thiserror::Error;

/// Help text for `homestead-keys`.
pub const KEY_HELP: &str = "\
Usage: homestead-keys [OPTIONS]

Creates an ed25519 SSH key pair and a ~/.ssh/config with sane defaults. Safe to run repeatedly:
existing keys are kept and missing config directives are added without touching the rest.

Options:
  --email <addr>  Comment for a newly generated key (default: <user>@<hostname>)
  --force         Remove the existing key pair and generate a new one
  --no-agent      Do not register the key with ssh-agent
  --no-copy       Do not copy the public key to the clipboard
  -h, --help      Show this help
";

/// Help text for `homestead`.
pub const SETUP_HELP: &str = "\
Usage: homestead [OPTIONS]

Provisions this workstation from a manifest: packages, shell, fonts, editor and SSH keys. Every
task checks whether it is already done before doing anything.

Options:
  --manifest <path>  Manifest to run (default: the built-in workstation manifest)
  --email <addr>     Comment for a newly generated SSH key (default: <user>@<hostname>)
  -h, --help         Show this help
";

/// A usage error on the command line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("unknown option: {0}")]
    Unknown(String),

    #[error("option {0} requires a value")]
    MissingValue(String),
}

/// What the user asked a binary to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<T> {
    /// Run with the parsed options.
    Run(T),

    /// Print the help text and exit successfully.
    Help,
}

/// Options for `homestead-keys`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyArgs {
    pub email: Option<String>,
    pub force: bool,
    pub no_agent: bool,
    pub no_copy: bool,
}

/// Options for `homestead`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupArgs {
    pub manifest: Option<PathBuf>,
    pub email: Option<String>,
}

/// Parses the arguments of `homestead-keys`, excluding the program name.
///
/// Arguments are processed left to right, and the first error wins. `-h` or `--help` returns
/// [Command::Help] as soon as it is reached.
pub fn parse_key_args<I>(args: I) -> Result<Command<KeyArgs>, ArgError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut parsed = KeyArgs::default();
    let mut args = args.into_iter().map(Into::<String>::into);

    while let Some(arg) = args.next() {
        let (flag, inline) = split_inline(&arg);
        match flag {
            "-h" | "--help" => return Ok(Command::Help),
            "--email" => parsed.email = Some(value(flag, inline, &mut args)?),
            "--force" if inline.is_none() => parsed.force = true,
            "--no-agent" if inline.is_none() => parsed.no_agent = true,
            "--no-copy" if inline.is_none() => parsed.no_copy = true,
            _ => return Err(ArgError::Unknown(arg.clone())),
        }
    }
    Ok(Command::Run(parsed))
}

/// Parses the arguments of `homestead`, excluding the program name.
pub fn parse_setup_args<I>(args: I) -> Result<Command<SetupArgs>, ArgError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut parsed = SetupArgs::default();
    let mut args = args.into_iter().map(Into::<String>::into);

    while let Some(arg) = args.next() {
        let (flag, inline) = split_inline(&arg);
        match flag {
            "-h" | "--help" => return Ok(Command::Help),
            "--manifest" => parsed.manifest = Some(value(flag, inline, &mut args)?.into()),
            "--email" => parsed.email = Some(value(flag, inline, &mut args)?),
            _ => return Err(ArgError::Unknown(arg.clone())),
        }
    }
    Ok(Command::Run(parsed))
}

/// Splits `--flag=value` into its flag and value. Short flags and bare words are returned whole.
fn split_inline(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
        _ => (arg, None),
    }
}

/// Returns the value of an option, either from `--flag=value` or from the next argument.
fn value(
    flag: &str,
    inline: Option<&str>,
    rest: &mut impl Iterator<Item = String>,
) -> Result<String, ArgError> {
    let value = match inline {
        Some(value) => Some(value.to_string()),
        None => rest.next(),
    };
    match value {
        Some(value) if !value.is_empty() && (inline.is_some() || !value.starts_with('-')) => {
            Ok(value)
        }
        _ => Err(ArgError::MissingValue(flag.to_string())),
    }
}
