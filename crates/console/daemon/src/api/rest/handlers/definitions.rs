//! Workflow definition handlers

use crate::api::rest::auth::Actor;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use console_types::EntityType;
use serde::Deserialize;
use workflow_engine::DeleteOutcome;
use workflow_types::{DefinitionDraft, DefinitionPatch, WorkflowDefinition, WorkflowDefinitionId};

/// Definition list filter
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDefinitionsQuery {
    #[serde(default)]
    pub entity_type: Option<String>,
}

/// List definitions, oldest first
pub async fn list_definitions(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Query(query): Query<ListDefinitionsQuery>,
) -> ApiResult<Json<Vec<WorkflowDefinition>>> {
    let entity_type = query
        .entity_type
        .map(|raw| raw.parse::<EntityType>())
        .transpose()
        .map_err(ApiError::Validation)?;
    Ok(Json(state.engine.definitions.list(entity_type).await?))
}

/// Get a specific definition
pub async fn get_definition(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowDefinition>> {
    let definition = state
        .engine
        .definitions
        .get(&WorkflowDefinitionId::new(id))
        .await?;
    Ok(Json(definition))
}

/// Create a definition
pub async fn create_definition(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(draft): Json<DefinitionDraft>,
) -> ApiResult<Json<WorkflowDefinition>> {
    Ok(Json(state.engine.definitions.create(&actor, draft).await?))
}

/// Patch a definition; bumps its version
pub async fn update_definition(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(patch): Json<DefinitionPatch>,
) -> ApiResult<Json<WorkflowDefinition>> {
    let definition = state
        .engine
        .definitions
        .update(&actor, &WorkflowDefinitionId::new(id), patch)
        .await?;
    Ok(Json(definition))
}

/// Delete a definition, or deactivate it while instances reference it
pub async fn delete_definition(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state
        .engine
        .definitions
        .delete(&actor, &WorkflowDefinitionId::new(id))
        .await?;
    Ok(Json(outcome))
}
