//! Approval workflow runtime
//!
//! Control flow for a task action:
//!
//! ```text
//! ActionProcessor ──▶ resolver::authorize ──▶ apply_transition ──▶ commit_transition
//!                       (pure, entity graph)    (in-memory copy)     (CAS + audit record)
//! ```
//!
//! - [`DefinitionStore`]: CRUD for reusable step-list templates
//! - [`resolver`]: who may act at a step, as a pure function
//! - [`InstanceEngine`]: binds a definition to a task and projects status
//! - [`ActionProcessor`]: authorization and the step/instance state machine
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(storage: std::sync::Arc<dyn console_storage::ConsoleStorage>) -> console_types::ConsoleResult<()> {
//! use console_types::{ActionKind, Role, TaskId, User};
//! use workflow_engine::{ActionRequest, WorkflowEngine};
//!
//! let engine = WorkflowEngine::new(storage);
//! let pm = User::new("pm-1", "Pat", Role::Pm);
//! let task = TaskId::new("t-1");
//!
//! engine.instances.start_for_task(&pm, &task, None).await?;
//! engine
//!     .actions
//!     .apply(&pm, &task, ActionRequest::new(ActionKind::Approve))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod action_processor;
pub mod definition_store;
mod engine;
mod graph;
pub mod instance_engine;
pub mod resolver;

pub use action_processor::{apply_transition, ActionOutcome, ActionProcessor, ActionRequest};
pub use definition_store::{DefinitionStore, DeleteOutcome};
pub use engine::WorkflowEngine;
pub use graph::TaskGraph;
pub use instance_engine::{ApproverPreview, InstanceEngine, WorkflowStatusView};
pub use resolver::{ApproverSet, ResolutionContext};
