//! Provisions this workstation from a manifest.

use homestead::cli::{self, Command, SETUP_HELP};
use homestead::config::Settings;
use homestead::core::Manifest;
use homestead::logger;
use homestead::run_plan::report::Reporter;
use homestead::run_plan::{run_plan, Runner};
use homestead::ssh::Toolbox;
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    logger::init();

    let args = match cli::parse_setup_args(env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            print!("{SETUP_HELP}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("homestead: {err}\n");
            eprint!("{SETUP_HELP}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("homestead: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &cli::SetupArgs) -> anyhow::Result<()> {
    let manifest = match &args.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::builtin()?,
    };
    let settings = Settings::from_environment()?.with_setup_args(args);
    tracing::debug!(manifest = %manifest.name, ?settings, "starting");

    let tools = Toolbox::system();
    let mut runner = Runner::new(Reporter::new(), settings.force);
    run_plan(&manifest, &settings, &tools, &mut runner)?;
    Ok(())
}
