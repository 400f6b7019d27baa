//! Instance engine: binds definitions to tasks and projects their status
//!
//! Starting an instance snapshots the definition's steps once; nothing in
//! this module reads a definition again after that.

use crate::definition_store::DefinitionStore;
use crate::graph::TaskGraph;
use crate::resolver::{self, ApproverSet};
use console_storage::ConsoleStorage;
use console_types::{ConsoleError, ConsoleResult, EntityRef, EntityType, TaskId, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow_types::{
    InstanceStatus, StepId, WorkflowAction, WorkflowDefinitionId, WorkflowInstance,
};

/// Read-only status projection used by task detail pages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatusView {
    pub entity: EntityRef,
    /// `NOT_STARTED` when the task never entered a workflow
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<WorkflowInstance>,
}

/// Who may act at the current step, and whether the caller is one of them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproverPreview {
    pub step_id: StepId,
    pub step_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approvers: Option<ApproverSet>,
    /// Set when the step's dynamic rule resolves to nobody
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_error: Option<String>,
    pub actor_may_act: bool,
}

/// Starts instances and answers status queries
#[derive(Clone)]
pub struct InstanceEngine {
    storage: Arc<dyn ConsoleStorage>,
    definitions: DefinitionStore,
}

impl InstanceEngine {
    pub fn new(storage: Arc<dyn ConsoleStorage>, definitions: DefinitionStore) -> Self {
        Self {
            storage,
            definitions,
        }
    }

    /// Start a workflow for a task.
    ///
    /// Without a definition id the first active TASK definition is used.
    /// Fails with `Conflict` if the definition is inactive or the task
    /// already has an in-progress instance of any definition.
    pub async fn start_for_task(
        &self,
        actor: &User,
        task_id: &TaskId,
        definition_id: Option<&WorkflowDefinitionId>,
    ) -> ConsoleResult<WorkflowInstance> {
        let task = self
            .storage
            .get_task(task_id)
            .await?
            .ok_or_else(|| ConsoleError::not_found(format!("task {} not found", task_id)))?;

        let definition = match definition_id {
            Some(id) => self.definitions.get(id).await?,
            None => self.definitions.default_for(EntityType::Task).await?,
        };
        if !definition.active {
            return Err(ConsoleError::conflict(format!(
                "workflow definition {} is inactive",
                definition.id
            )));
        }

        let instance =
            WorkflowInstance::start(&definition, EntityRef::task(&task.id), actor.id.clone())?;
        let instance = self.storage.insert_instance(instance).await?;

        tracing::info!(
            instance_id = %instance.id,
            definition_id = %definition.id,
            definition_version = definition.version,
            entity = %instance.entity,
            actor = %actor.id,
            "Workflow instance started"
        );
        Ok(instance)
    }

    /// The latest instance bound to a task, if any
    pub async fn latest_for_task(
        &self,
        task_id: &TaskId,
    ) -> ConsoleResult<Option<WorkflowInstance>> {
        Ok(self
            .storage
            .latest_instance_for(&EntityRef::task(task_id))
            .await?)
    }

    /// Status projection; always reflects the latest persisted instance
    pub async fn status(&self, task_id: &TaskId) -> ConsoleResult<WorkflowStatusView> {
        if self.storage.get_task(task_id).await?.is_none() {
            return Err(ConsoleError::not_found(format!("task {} not found", task_id)));
        }
        let instance = self.latest_for_task(task_id).await?;

        let (status, current_step_id, current_step_name) = match &instance {
            Some(inst) => (
                inst.status,
                inst.current_step_id.clone(),
                inst.current_step().map(|s| s.name().to_string()),
            ),
            None => (InstanceStatus::NotStarted, None, None),
        };

        Ok(WorkflowStatusView {
            entity: EntityRef::task(task_id),
            status,
            current_step_id,
            current_step_name,
            instance,
        })
    }

    /// Audit records of the task's latest instance, oldest first
    pub async fn actions(&self, task_id: &TaskId) -> ConsoleResult<Vec<WorkflowAction>> {
        let instance = self.latest_for_task(task_id).await?.ok_or_else(|| {
            ConsoleError::not_found(format!("no workflow instance for task {}", task_id))
        })?;
        Ok(self.storage.list_actions(&instance.id).await?)
    }

    /// Resolve the current step's approvers without acting
    pub async fn preview_approvers(
        &self,
        actor: &User,
        task_id: &TaskId,
    ) -> ConsoleResult<ApproverPreview> {
        let graph = TaskGraph::load(self.storage.as_ref(), task_id).await?;
        let instance = self.latest_for_task(task_id).await?.ok_or_else(|| {
            ConsoleError::not_found(format!("no workflow instance for task {}", task_id))
        })?;
        let step = instance.current_step().ok_or_else(|| {
            ConsoleError::conflict(format!(
                "workflow instance {} is {}; no step is active",
                instance.id, instance.status
            ))
        })?;

        let resolved = resolver::resolve(&step.step.approver, graph.ctx());
        let (approvers, resolution_error) = match resolved {
            Ok(set) => (Some(set), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let actor_may_act = resolver::authorize(actor, &step.step, graph.ctx()).is_ok();

        Ok(ApproverPreview {
            step_id: step.id().clone(),
            step_name: step.name().to_string(),
            approvers,
            resolution_error,
            actor_may_act,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_storage::{InMemoryConsoleStorage, ProjectRepository};
    use console_types::{Project, ProjectId, Role, Task, UserId};
    use workflow_types::{DefinitionDraft, DefinitionPatch, StepDraft, StepStatus};

    struct Fixture {
        engine: InstanceEngine,
        definitions: DefinitionStore,
        definition_id: WorkflowDefinitionId,
    }

    fn admin() -> User {
        User::new("admin-1", "Ada", Role::Admin)
    }

    fn pm() -> User {
        User::new("pm-1", "Pat", Role::Pm)
    }

    async fn make_fixture() -> Fixture {
        let storage: Arc<dyn ConsoleStorage> = Arc::new(InMemoryConsoleStorage::new());
        storage.insert_user(pm()).await.unwrap();
        storage
            .insert_user(User::new("pjm-1", "Jo", Role::Pjm))
            .await
            .unwrap();
        storage
            .insert_project(
                Project::new("p-1", "Portal", UserId::new("pm-1"))
                    .with_delivery_manager(UserId::new("pjm-1")),
            )
            .await
            .unwrap();
        storage
            .insert_task(Task::new("t-1", ProjectId::new("p-1"), "Build login"))
            .await
            .unwrap();

        let definitions = DefinitionStore::new(storage.clone());
        let definition = definitions
            .create(
                &admin(),
                DefinitionDraft {
                    name: "Task Review".to_string(),
                    active: true,
                    steps: vec![
                        StepDraft {
                            name: "PM_REVIEW".to_string(),
                            order: 1,
                            approver_type: "ROLE".to_string(),
                            approver_role: Some("PM".to_string()),
                            ..Default::default()
                        },
                        StepDraft {
                            name: "VENDOR_REVIEW".to_string(),
                            order: 2,
                            approver_type: "DYNAMIC".to_string(),
                            dynamic_rule: Some("TASK_PROJECT_MANAGER".to_string()),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Fixture {
            engine: InstanceEngine::new(storage, definitions.clone()),
            definitions,
            definition_id: definition.id,
        }
    }

    #[tokio::test]
    async fn test_start_uses_default_definition() {
        let fx = make_fixture().await;
        let instance = fx
            .engine
            .start_for_task(&pm(), &TaskId::new("t-1"), None)
            .await
            .unwrap();
        assert_eq!(instance.definition_id, fx.definition_id);
        assert_eq!(instance.status, InstanceStatus::InProgress);
        assert_eq!(instance.steps[0].status, StepStatus::Active);
        assert_eq!(instance.version, 1);
    }

    #[tokio::test]
    async fn test_second_start_conflicts() {
        let fx = make_fixture().await;
        let task = TaskId::new("t-1");
        fx.engine
            .start_for_task(&pm(), &task, Some(&fx.definition_id))
            .await
            .unwrap();
        let result = fx
            .engine
            .start_for_task(&pm(), &task, Some(&fx.definition_id))
            .await;
        assert!(matches!(result, Err(ConsoleError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_start_with_other_definition_conflicts_while_in_progress() {
        let fx = make_fixture().await;
        let other = fx
            .definitions
            .create(
                &admin(),
                DefinitionDraft {
                    name: "Quick Check".to_string(),
                    active: true,
                    steps: vec![StepDraft {
                        name: "PM_CHECK".to_string(),
                        order: 1,
                        approver_type: "ROLE".to_string(),
                        approver_role: Some("PM".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let task = TaskId::new("t-1");
        let first = fx
            .engine
            .start_for_task(&pm(), &task, Some(&fx.definition_id))
            .await
            .unwrap();
        let result = fx.engine.start_for_task(&pm(), &task, Some(&other.id)).await;
        assert!(matches!(result, Err(ConsoleError::Conflict(_))));

        let view = fx.engine.status(&task).await.unwrap();
        assert_eq!(view.instance.map(|i| i.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_inactive_definition_cannot_start() {
        let fx = make_fixture().await;
        fx.definitions
            .update(
                &admin(),
                &fx.definition_id,
                DefinitionPatch {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let result = fx
            .engine
            .start_for_task(&pm(), &TaskId::new("t-1"), Some(&fx.definition_id))
            .await;
        assert!(matches!(result, Err(ConsoleError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let fx = make_fixture().await;
        let result = fx
            .engine
            .start_for_task(&pm(), &TaskId::new("missing"), None)
            .await;
        assert!(matches!(result, Err(ConsoleError::NotFound(_))));
        assert!(matches!(
            fx.engine.status(&TaskId::new("missing")).await,
            Err(ConsoleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_before_and_after_start() {
        let fx = make_fixture().await;
        let task = TaskId::new("t-1");
        let before = fx.engine.status(&task).await.unwrap();
        assert_eq!(before.status, InstanceStatus::NotStarted);
        assert!(before.instance.is_none());

        fx.engine.start_for_task(&pm(), &task, None).await.unwrap();
        let after = fx.engine.status(&task).await.unwrap();
        assert_eq!(after.status, InstanceStatus::InProgress);
        assert_eq!(after.current_step_name.as_deref(), Some("PM_REVIEW"));
    }

    #[tokio::test]
    async fn test_definition_edits_do_not_reach_running_instance() {
        let fx = make_fixture().await;
        let task = TaskId::new("t-1");
        fx.engine.start_for_task(&pm(), &task, None).await.unwrap();

        fx.definitions
            .update(
                &admin(),
                &fx.definition_id,
                DefinitionPatch {
                    steps: Some(vec![StepDraft {
                        name: "ADMIN_ONLY".to_string(),
                        order: 1,
                        approver_type: "ROLE".to_string(),
                        approver_role: Some("ADMIN".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let status = fx.engine.status(&task).await.unwrap();
        let instance = status.instance.unwrap();
        assert_eq!(instance.steps.len(), 2);
        assert_eq!(instance.definition_version, 1);
        assert_eq!(instance.steps[0].name(), "PM_REVIEW");
    }

    #[tokio::test]
    async fn test_preview_reports_role_approvers() {
        let fx = make_fixture().await;
        let task = TaskId::new("t-1");
        fx.engine.start_for_task(&pm(), &task, None).await.unwrap();

        let preview = fx.engine.preview_approvers(&pm(), &task).await.unwrap();
        assert_eq!(preview.step_name, "PM_REVIEW");
        assert_eq!(preview.approvers, Some(ApproverSet::AnyWithRole { role: Role::Pm }));
        assert!(preview.actor_may_act);

        let other = User::new("pjm-1", "Jo", Role::Pjm);
        let preview = fx.engine.preview_approvers(&other, &task).await.unwrap();
        assert!(!preview.actor_may_act);
    }

    #[tokio::test]
    async fn test_actions_require_instance() {
        let fx = make_fixture().await;
        let result = fx.engine.actions(&TaskId::new("t-1")).await;
        assert!(matches!(result, Err(ConsoleError::NotFound(_))));
    }
}
