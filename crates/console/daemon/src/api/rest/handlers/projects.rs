//! Project and package staging handlers

use crate::api::rest::auth::Actor;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use console_types::{CompanyId, Project, ProjectId, Role, SentBackTarget, User, UserId};
use package_gate::PackageView;
use serde::Deserialize;

/// Create project request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Defaults to the calling actor
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub delivery_manager_user_id: Option<String>,
    #[serde(default)]
    pub vendor_company_ids: Vec<String>,
    #[serde(default)]
    pub member_user_ids: Vec<String>,
}

impl CreateProjectRequest {
    /// Build a PM_DRAFT project; `default_owner` is used when no owner is named
    pub fn into_project(self, default_owner: Option<&UserId>) -> ApiResult<Project> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("project name must not be empty".to_string()));
        }
        let owner = match (self.owner_id, default_owner) {
            (Some(owner), _) => UserId::new(owner),
            (None, Some(owner)) => owner.clone(),
            (None, None) => {
                return Err(ApiError::Validation("project must have an owner".to_string()))
            }
        };
        let id = self.id.unwrap_or_else(|| ProjectId::generate().to_string());

        let mut project = Project::new(id, self.name, owner);
        if let Some(manager) = self.delivery_manager_user_id {
            project = project.with_delivery_manager(UserId::new(manager));
        }
        for company in self.vendor_company_ids {
            project = project.with_vendor_company(CompanyId::new(company));
        }
        for member in self.member_user_ids {
            project = project.with_member(UserId::new(member));
        }
        Ok(project)
    }
}

/// Create a project in PM_DRAFT
pub async fn create_project(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    ensure_project_creator(&actor)?;
    let project = request.into_project(Some(&actor.id))?;
    let project = state.storage.insert_project(project).await?;

    tracing::info!(
        project_id = %project.id,
        owner = %project.owner_id,
        actor = %actor.id,
        "Created project"
    );
    Ok(Json(project))
}

fn ensure_project_creator(actor: &User) -> ApiResult<()> {
    if matches!(actor.role, Role::SuperAdmin | Role::Admin | Role::Pm) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "{} ({}) may not create projects",
            actor.id, actor.role
        )))
    }
}

/// Get a project
pub async fn get_project(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = state
        .storage
        .get_project(&ProjectId::new(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", id)))?;
    Ok(Json(project))
}

/// Package status and what the caller may do with it
pub async fn get_package(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<PackageView>> {
    Ok(Json(state.gate.view(&actor, &ProjectId::new(id)).await?))
}

/// PM_DRAFT (or SENT_BACK to PM) → PJM_REVIEW
pub async fn submit_package(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.gate.submit(&actor, &ProjectId::new(id)).await?))
}

/// PJM_REVIEW (or SENT_BACK to PJM/ENG) → PM_ACTIVATE
pub async fn accept_package(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.gate.accept(&actor, &ProjectId::new(id)).await?))
}

/// PM_ACTIVATE → ACTIVE
pub async fn activate_package(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.gate.activate(&actor, &ProjectId::new(id)).await?))
}

/// Send-back request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBackRequest {
    pub target_stage: String,
    #[serde(default)]
    pub reason: String,
}

/// Return the package to an earlier stage
pub async fn send_back_package(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(request): Json<SendBackRequest>,
) -> ApiResult<Json<Project>> {
    let target: SentBackTarget = request.target_stage.parse().map_err(ApiError::Validation)?;
    let project = state
        .gate
        .send_back(&actor, &ProjectId::new(id), target, &request.reason)
        .await?;
    Ok(Json(project))
}
