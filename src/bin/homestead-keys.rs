//! Creates an ed25519 SSH key pair and a sane `~/.ssh/config`, then prints the public key.

use homestead::cli::{self, Command, KEY_HELP};
use homestead::config::Settings;
use homestead::logger;
use homestead::run_plan::report::Reporter;
use homestead::run_plan::Runner;
use homestead::ssh::{self, Toolbox};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    logger::init();

    let args = match cli::parse_key_args(env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            print!("{KEY_HELP}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("homestead-keys: {err}\n");
            eprint!("{KEY_HELP}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("homestead-keys: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &cli::KeyArgs) -> anyhow::Result<()> {
    let settings = Settings::from_environment()?.with_key_args(args);
    tracing::debug!(?settings, "starting");

    let tools = Toolbox::system();
    let mut runner = Runner::new(Reporter::new(), settings.force);
    ssh::run_key_setup(&settings, &tools, &mut runner)?;
    Ok(())
}
