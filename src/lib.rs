//! Idempotent provisioning for a fresh Debian/Ubuntu workstation.
//!
//! # Steps
//!
//! Everything Homestead does is expressed as a [Step]: a named unit of work with a condition
//! checker and a mutator. Before changing anything, a step checks whether its target condition
//! already holds (a file exists, a package is installed, a config line is present). The [Runner]
//! only invokes the mutator when the condition does not hold, so running Homestead twice is safe.
//!
//! Each step is either *required* or *best-effort*. A failed required step aborts the run; a
//! failed best-effort step (registering a key with `ssh-agent`, copying to the clipboard) is
//! reported as a warning and the run continues.
//!
//! # Program flow
//!
//! 1. A binary parses its command line ([cli]) and builds [Settings] once from the environment.
//!
//! 2. The steps are assembled into a [Plan]: either the SSH key flow from [ssh::key_steps], or a
//!    machine-setup [Manifest] loaded from YAML, which may itself include the SSH key flow.
//!
//! 3. The [Runner] walks the plan in order and reports each outcome through a [Report]
//!    implementation.
//!
//! [Manifest]: core::Manifest
//! [Plan]: core::Plan
//! [Report]: run_plan::report::Report
//! [Runner]: run_plan::Runner
//! [Settings]: config::Settings
//! [Step]: core::Step

pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod logger;
pub mod run_plan;
pub mod ssh;

#[doc(inline)]
pub use run_plan::run_plan;
