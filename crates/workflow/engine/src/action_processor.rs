//! Task workflow action processor
//!
//! Applies APPROVE / REJECT / SEND_BACK / REQUEST_CHANGE to the ACTIVE
//! step of a task's workflow instance:
//!
//! ```text
//! step:      PENDING → ACTIVE → APPROVED | REJECTED | CHANGES_REQUESTED | SENT_BACK
//! instance:  IN_PROGRESS → COMPLETED | REJECTED | CHANGES_REQUESTED
//! ```
//!
//! Every check runs against a copy of the stored instance. The copy is
//! committed together with its audit record through the store's
//! compare-and-set, so a refused or losing attempt changes nothing.

use crate::graph::TaskGraph;
use crate::resolver;
use chrono::{DateTime, Utc};
use console_storage::ConsoleStorage;
use console_types::{ActionKind, ConsoleError, ConsoleResult, EntityRef, TaskId, User, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow_types::{InstanceStatus, WorkflowAction, WorkflowActionAppend, WorkflowInstance};

/// An action submitted against a task's current step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ActionRequest {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// The committed result of an accepted action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub instance: WorkflowInstance,
    pub record: WorkflowAction,
}

/// Apply `action` to the instance's ACTIVE step, in memory.
///
/// Enforces the step/instance state machine only; authorization and
/// comment requirements are checked by [`ActionProcessor::apply`].
pub fn apply_transition(
    instance: &mut WorkflowInstance,
    actor: &UserId,
    action: ActionKind,
    comment: Option<String>,
    at: DateTime<Utc>,
) -> ConsoleResult<()> {
    if !instance.is_in_progress() {
        return Err(ConsoleError::conflict(format!(
            "workflow instance {} is {}, not IN_PROGRESS",
            instance.id, instance.status
        )));
    }
    let index = instance.current_index().ok_or_else(|| {
        ConsoleError::conflict(format!(
            "workflow instance {} has no active step",
            instance.id
        ))
    })?;

    instance.record_step_outcome(index, actor.clone(), action, comment, at)?;

    match action {
        ActionKind::Approve => {
            if index + 1 == instance.steps.len() {
                instance.finish(InstanceStatus::Completed, at)?;
            } else {
                instance.activate_step(index + 1, at)?;
            }
        }
        ActionKind::Reject => instance.finish(InstanceStatus::Rejected, at)?,
        ActionKind::RequestChange => instance.finish(InstanceStatus::ChangesRequested, at)?,
        // Later steps keep whatever status they reached in the earlier pass
        ActionKind::SendBack => instance.activate_step(0, at)?,
    }
    Ok(())
}

/// Blank comments count as no comment
fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Authorizes and commits workflow actions
#[derive(Clone)]
pub struct ActionProcessor {
    storage: Arc<dyn ConsoleStorage>,
}

impl ActionProcessor {
    pub fn new(storage: Arc<dyn ConsoleStorage>) -> Self {
        Self { storage }
    }

    /// Apply an action to the current step of the task's latest instance
    pub async fn apply(
        &self,
        actor: &User,
        task_id: &TaskId,
        request: ActionRequest,
    ) -> ConsoleResult<ActionOutcome> {
        let result = self.try_apply(actor, task_id, request.clone()).await;
        if let Err(e) = &result {
            tracing::debug!(
                task_id = %task_id,
                actor = %actor.id,
                action = %request.action,
                error = %e,
                "Workflow action refused"
            );
        }
        result
    }

    async fn try_apply(
        &self,
        actor: &User,
        task_id: &TaskId,
        request: ActionRequest,
    ) -> ConsoleResult<ActionOutcome> {
        let graph = TaskGraph::load(self.storage.as_ref(), task_id).await?;
        let stored = self
            .storage
            .latest_instance_for(&EntityRef::task(task_id))
            .await?
            .ok_or_else(|| {
                ConsoleError::not_found(format!("no workflow instance for task {}", task_id))
            })?;

        if !stored.is_in_progress() {
            return Err(ConsoleError::conflict(format!(
                "workflow instance {} is {}; no further actions are accepted",
                stored.id, stored.status
            )));
        }
        let step = stored.current_step().ok_or_else(|| {
            ConsoleError::conflict(format!("workflow instance {} has no active step", stored.id))
        })?;
        let step_id = step.id().clone();
        let step_name = step.name().to_string();

        if !step.step.permits(request.action) {
            return Err(ConsoleError::validation(format!(
                "action {} is not permitted at step '{}'",
                request.action, step_name
            )));
        }

        resolver::authorize(actor, &step.step, graph.ctx())?;

        let comment = normalize_comment(request.comment);
        if comment.is_none() && step.step.requires_comment_for(request.action) {
            return Err(ConsoleError::validation(format!(
                "a comment is required to {} at step '{}'",
                request.action, step_name
            )));
        }

        let now = Utc::now();
        let expected_version = stored.version;
        let mut next = stored.clone();
        apply_transition(&mut next, &actor.id, request.action, comment.clone(), now)?;

        let append = WorkflowActionAppend {
            instance_id: next.id.clone(),
            step_id: step_id.clone(),
            actor_id: actor.id.clone(),
            action: request.action,
            comment,
            metadata: serde_json::json!({
                "stepName": step_name,
                "actorRole": actor.role,
                "taskId": task_id,
                "resultingStatus": next.status,
                "resultingStepId": next.current_step_id,
            }),
            timestamp: now,
        };

        let (instance, record) = self
            .storage
            .commit_transition(next, expected_version, append)
            .await?;

        tracing::info!(
            instance_id = %instance.id,
            step_id = %step_id,
            actor = %actor.id,
            action = %record.action,
            status = %instance.status,
            sequence = record.sequence,
            "Workflow action accepted"
        );
        Ok(ActionOutcome { instance, record })
    }
}
