//! Domain types shared by the Delivery Console approval subsystem.
//!
//! The console is mostly CRUD over projects, tasks, timesheets and vendors.
//! This crate only carries the slice of that entity graph the approval
//! subsystem reads and writes:
//!
//! - **Directory**: users and their [`Role`], tasks and their assignment plan
//! - **Project**: ownership, vendor-side delivery manager, linked vendor
//!   companies and the package staging fields ([`PackageState`])
//! - **Action vocabulary**: [`ActionKind`], shared by the generic workflow
//!   engine and the package stage gate
//! - **Error taxonomy**: [`ConsoleError`], the five failure kinds every
//!   operation reports to its caller

#![deny(unsafe_code)]

mod action;
mod directory;
mod entity;
mod errors;
mod ids;
mod project;
mod role;

pub use action::*;
pub use directory::*;
pub use entity::*;
pub use errors::*;
pub use ids::*;
pub use project::*;
pub use role::*;
