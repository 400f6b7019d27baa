//! Storage abstractions for the approval subsystem.
//!
//! One repository trait per collection:
//! - directory rows the approver resolver reads (users, tasks)
//! - projects, including their package staging fields
//! - workflow definitions
//! - workflow instances, with the compare-and-set transition commit
//! - the append-only, hash-linked workflow action log
//!
//! Design stance:
//! - every mutable record carries a `version`; writers state the version
//!   they read and lose with `StorageError::Conflict` if someone else won.
//! - an instance transition and its audit record commit together or not at all.

#![deny(unsafe_code)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryConsoleStorage;
pub use traits::{
    ActionRepository, ConsoleStorage, DefinitionRepository, DirectoryRepository,
    InstanceRepository, ProjectRepository,
};
