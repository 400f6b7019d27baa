//! Console daemon: the REST surface of the approval subsystem
//!
//! Hosts the workflow engine and the package stage gate over one shared
//! store. Actors are identified by the `x-actor-id` header set by the
//! session layer in front of the daemon.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod seed;
pub mod server;

pub use config::ConsoleConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
