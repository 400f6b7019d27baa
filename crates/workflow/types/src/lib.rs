//! Approval Workflow Types
//!
//! An approval workflow is a strictly ordered chain of steps. Each step
//! names who may act (a fixed role, or a rule resolved against the task's
//! project) and which actions are permitted there.
//!
//! # Key Concepts
//!
//! - **WorkflowDefinition**: an admin-authored template: ordered
//!   [`WorkflowStepDefinition`]s, each carrying an [`ApproverRule`].
//! - **WorkflowInstance**: one definition bound to one entity. The steps
//!   are copied into the instance when it starts, so later edits to the
//!   definition never reach an instance already in flight.
//! - **WorkflowAction**: the append-only audit record written once per
//!   accepted action, hash-linked per instance.
//!
//! # Design Principles
//!
//! 1. Invalid step shapes cannot be represented: a step is either a role
//!    step or a dynamic step, never both or neither.
//! 2. Instances are never deleted; together with their action log they are
//!    the permanent audit trail of the entity.
//! 3. Steps are strictly ordered. There are no parallel or branching steps.

#![deny(unsafe_code)]

mod action;
mod definition;
mod instance;

pub use action::*;
pub use definition::*;
pub use instance::*;
