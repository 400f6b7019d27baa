//! Project Package Staging
//!
//! A hand-rolled three-stage machine over the package fields stored on the
//! project record itself. It shares the action vocabulary and error
//! taxonomy with the workflow engine but none of its instance machinery.
//!
//! - [`stage`]: stages, forward actions, send-back and the pure transition rules
//! - [`PackageGate`]: loads a project, checks stage and actor, commits
//!   through the project's compare-and-set version

#![deny(unsafe_code)]

mod gate;
pub mod stage;

pub use gate::{can_edit_package_fields, GatePolicy, PackageGate, PackageView};
pub use stage::{effective_stage, PackageAction, PackageStage};
