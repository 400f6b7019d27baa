//! Task and task workflow handlers

use crate::api::rest::auth::Actor;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use console_types::{ActionKind, Assignment, ProjectId, Task, TaskId, UserId};
use serde::Deserialize;
use workflow_engine::{ActionOutcome, ActionRequest, ApproverPreview, WorkflowStatusView};
use workflow_types::{WorkflowAction, WorkflowDefinitionId, WorkflowInstance};

/// Create task request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub assignee_user_id: Option<String>,
    #[serde(default)]
    pub assignment_plan: Vec<Assignment>,
}

impl CreateTaskRequest {
    pub fn into_task(self) -> ApiResult<Task> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("task title must not be empty".to_string()));
        }
        let id = self.id.unwrap_or_else(|| TaskId::generate().to_string());
        let mut task = Task::new(id, ProjectId::new(self.project_id), self.title);
        if let Some(assignee) = self.assignee_user_id {
            task = task.with_assignee(UserId::new(assignee));
        }
        task.assignment_plan = self.assignment_plan;
        Ok(task)
    }
}

/// Register a task under an existing project
pub async fn create_task(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = request.into_task()?;
    if state.storage.get_project(&task.project_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "project {} not found",
            task.project_id
        )));
    }
    state.storage.insert_task(task.clone()).await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %task.project_id,
        actor = %actor.id,
        "Created task"
    );
    Ok(Json(task))
}

/// Get a task
pub async fn get_task(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .storage
        .get_task(&TaskId::new(&task_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {} not found", task_id)))?;
    Ok(Json(task))
}

/// Start workflow request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest {
    #[serde(default)]
    pub definition_id: Option<String>,
}

/// Start a workflow instance for a task
pub async fn start_workflow(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(task_id): Path<String>,
    request: Option<Json<StartWorkflowRequest>>,
) -> ApiResult<Json<WorkflowInstance>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let definition_id = request.definition_id.map(WorkflowDefinitionId::new);
    let instance = state
        .engine
        .instances
        .start_for_task(&actor, &TaskId::new(task_id), definition_id.as_ref())
        .await?;
    Ok(Json(instance))
}

/// Workflow status of a task; NOT_STARTED if it never entered one
pub async fn get_workflow_status(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(task_id): Path<String>,
) -> ApiResult<Json<WorkflowStatusView>> {
    Ok(Json(
        state.engine.instances.status(&TaskId::new(task_id)).await?,
    ))
}

/// Who may act on the current step
pub async fn preview_approvers(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(task_id): Path<String>,
) -> ApiResult<Json<ApproverPreview>> {
    let preview = state
        .engine
        .instances
        .preview_approvers(&actor, &TaskId::new(task_id))
        .await?;
    Ok(Json(preview))
}

/// Audit records of the task's latest instance
pub async fn list_workflow_actions(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Vec<WorkflowAction>>> {
    Ok(Json(
        state.engine.instances.actions(&TaskId::new(task_id)).await?,
    ))
}

/// Workflow action request
#[derive(Debug, Deserialize)]
pub struct SubmitActionRequest {
    pub action: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Act on the current step of the task's workflow
pub async fn submit_action(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(task_id): Path<String>,
    Json(request): Json<SubmitActionRequest>,
) -> ApiResult<Json<ActionOutcome>> {
    let action: ActionKind = request.action.parse()?;
    let mut action_request = ActionRequest::new(action);
    if let Some(comment) = request.comment {
        action_request = action_request.with_comment(comment);
    }
    let outcome = state
        .engine
        .actions
        .apply(&actor, &TaskId::new(task_id), action_request)
        .await?;
    Ok(Json(outcome))
}
