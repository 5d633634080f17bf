//! Runs [Step]s: check, then apply only when needed, then verify.

pub mod report;

use crate::client;
use crate::config::Settings;
use crate::core::{Class, Manifest, Outcome, Plan, Step};
use crate::ssh::Toolbox;
use anyhow::{bail, Context};
use report::{Report, Summary};

/// Reason given when a mutator succeeds but its condition still does not hold.
pub const UNMET_AFTER_APPLY: &str = "condition still unmet after apply";

/// Runs steps one at a time and reports each [Outcome].
///
/// A failed [Class::Required] step stops the run: [Runner::run] returns an error after reporting
/// it. A failed [Class::BestEffort] step is reported as a warning and the run continues.
#[derive(Debug)]
pub struct Runner<R: Report> {
    force: bool,
    reporter: R,
    summary: Summary,
}

impl<R: Report> Runner<R> {
    /// Creates a [Runner]. When `force` is set, [forceable] steps skip their check, reset, and
    /// re-apply.
    ///
    /// [forceable]: Step::forceable
    pub fn new(reporter: R, force: bool) -> Self {
        Runner {
            force,
            reporter,
            summary: Summary::default(),
        }
    }

    /// Runs a single step and reports its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if a required step fails or if reporting fails.
    pub fn run(&mut self, step: &dyn Step) -> anyhow::Result<Outcome> {
        let outcome = execute(step, self.force);
        let class = step.class();
        tracing::debug!(step = step.name(), ?class, %outcome, "finished");

        self.summary.record(class, &outcome);
        self.reporter
            .outcome(step.name(), class, &outcome)
            .context("could not write status")?;

        if let (Outcome::Failed(reason), Class::Required) = (&outcome, class) {
            bail!("{} failed: {reason}", step.name());
        }
        Ok(outcome)
    }

    /// Runs every step of `plan` in order, stopping at the first required failure.
    pub fn run_plan(&mut self, plan: &Plan) -> anyhow::Result<()> {
        for step in plan.steps() {
            self.run(step)?;
        }
        Ok(())
    }

    /// Passes a plain message to the reporter.
    pub fn note(&mut self, message: &str) -> anyhow::Result<()> {
        self.reporter
            .note(message)
            .context("could not write to stdout")
    }

    /// The outcomes counted so far.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Reports the totals and returns them.
    pub fn finish(&mut self) -> anyhow::Result<Summary> {
        self.reporter
            .summary(&self.summary)
            .context("could not write summary")?;
        Ok(self.summary)
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }
}

/// The step runner proper. Never fails; every error becomes [Outcome::Failed].
fn execute(step: &dyn Step, force: bool) -> Outcome {
    let forced = force && step.forceable();

    if forced {
        tracing::debug!(step = step.name(), "forced; resetting");
        if let Err(err) = step.reset() {
            return Outcome::Failed(format!("{err:#}"));
        }
    } else {
        match step.check() {
            Ok(true) => return Outcome::Skipped,
            Ok(false) => tracing::debug!(step = step.name(), "condition unmet"),
            Err(err) => return Outcome::Failed(format!("{err:#}")),
        }
    }

    if let Err(err) = step.apply() {
        return Outcome::Failed(format!("{err:#}"));
    }

    match step.verify() {
        Ok(true) => Outcome::Applied,
        Ok(false) => Outcome::Failed(UNMET_AFTER_APPLY.to_string()),
        Err(err) => Outcome::Failed(format!("{err:#}")),
    }
}

/// Runs a machine-setup [Manifest] from start to finish.
///
/// # Errors
///
/// Aborts before running anything if the manifest installs packages and no package manager is
/// available. Otherwise returns the first required step failure.
pub fn run_plan<R: Report>(
    manifest: &Manifest,
    settings: &Settings,
    tools: &Toolbox,
    runner: &mut Runner<R>,
) -> anyhow::Result<Summary> {
    if manifest.needs_package_manager() {
        ensure_package_manager()?;
    }
    let plan = manifest.plan(settings, tools)?;
    tracing::info!(manifest = %manifest.name, steps = plan.len(), "running manifest");
    runner.run_plan(&plan)?;
    runner.finish()
}

/// Fails unless `apt-get` is on `PATH`.
pub fn ensure_package_manager() -> anyhow::Result<()> {
    match client::which("apt-get") {
        Some(path) => {
            tracing::debug!(path = %path.display(), "found package manager");
            Ok(())
        }
        None => bail!("apt-get was not found on PATH; only Debian and Ubuntu are supported"),
    }
}
