//! Types for representing a single manifest task.

use crate::core::action::Action;
#[cfg(doc)]
use crate::core::manifest::Manifest;
use crate::core::step::Class;
use serde::{Deserialize, Serialize};

/// One named entry in a [Manifest]: an [Action] plus how to treat its failure.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    /// The [Task]'s name, shown in status output.
    pub name: String,

    /// Whether failure aborts the run. Defaults to [Class::Required].
    #[serde(default, skip_serializing_if = "is_required")]
    pub class: Class,

    /// What the task does.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub action: Action,
}

fn is_required(class: &Class) -> bool {
    *class == Class::Required
}
