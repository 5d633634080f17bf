//! Provides the types that describe what to provision: steps, plans, and manifests.

pub mod action;
pub mod manifest;
pub mod plan;
pub mod step;
pub mod task;

#[doc(inline)]
pub use action::Action;

#[doc(inline)]
pub use manifest::Manifest;

#[doc(inline)]
pub use plan::Plan;

#[doc(inline)]
pub use step::{Class, Outcome, Step};

#[doc(inline)]
pub use task::Task;
