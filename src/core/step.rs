//! The idempotent step abstraction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a failing step aborts the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    /// Failure aborts the whole run, e.g. key generation or package installation.
    #[default]
    Required,

    /// Failure is reported as a warning and the run continues, e.g. clipboard copy.
    BestEffort,
}

/// The result of running one [Step].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The condition did not hold; the mutator ran and the condition now holds.
    Applied,

    /// The condition already held, so nothing was changed.
    Skipped,

    /// The step could not be completed. Carries a human-readable reason.
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::Skipped => write!(f, "already satisfied"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A named unit of provisioning work.
///
/// A step pairs a condition checker with a mutator. [Step::check] must not change anything; it
/// only reports whether the target state already holds. [Step::apply] changes the system so that
/// it does. The [Runner] decides which to call and when.
///
/// [Runner]: crate::run_plan::Runner
pub trait Step {
    /// A short name for status output, e.g. `ssh directory`.
    fn name(&self) -> &str;

    /// Whether failure aborts the run. Steps are required unless they say otherwise.
    fn class(&self) -> Class {
        Class::Required
    }

    /// Whether the force flag applies to this step.
    ///
    /// When forced, the runner skips [Step::check], calls [Step::reset] to clear prior state,
    /// and then calls [Step::apply].
    fn forceable(&self) -> bool {
        false
    }

    /// Returns whether the target condition already holds.
    fn check(&self) -> anyhow::Result<bool>;

    /// Destroys prior state before a forced re-apply. Only called on [forceable] steps.
    ///
    /// [forceable]: Step::forceable
    fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Changes the system so that the target condition holds.
    fn apply(&self) -> anyhow::Result<()>;

    /// Re-checks the condition after a successful [Step::apply].
    ///
    /// Defaults to [Step::check]. Steps whose effect cannot be observed afterwards, such as
    /// copying to a clipboard, override this to trust the mutator.
    fn verify(&self) -> anyhow::Result<bool> {
        self.check()
    }
}

impl<S: Step + ?Sized> Step for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn class(&self) -> Class {
        (**self).class()
    }

    fn forceable(&self) -> bool {
        (**self).forceable()
    }

    fn check(&self) -> anyhow::Result<bool> {
        (**self).check()
    }

    fn reset(&self) -> anyhow::Result<()> {
        (**self).reset()
    }

    fn apply(&self) -> anyhow::Result<()> {
        (**self).apply()
    }

    fn verify(&self) -> anyhow::Result<bool> {
        (**self).verify()
    }
}
