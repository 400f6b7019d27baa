//! Directory handlers: users

use crate::api::rest::auth::Actor;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use console_types::{CompanyId, Role, User, UserId};
use serde::Deserialize;

/// Create user request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl CreateUserRequest {
    pub fn into_user(self) -> ApiResult<User> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("user name must not be empty".to_string()));
        }
        let role: Role = self.role.parse().map_err(ApiError::Validation)?;
        let id = self.id.map(UserId::new).unwrap_or_else(UserId::generate);
        let mut user = User::new(id.as_str(), self.name, role);
        if let Some(company) = self.company_id {
            user = user.with_company(CompanyId::new(company));
        }
        Ok(user)
    }
}

/// Register a user; admins only
pub async fn create_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<Json<User>> {
    if !matches!(actor.role, Role::SuperAdmin | Role::Admin) {
        return Err(ApiError::Forbidden(format!(
            "{} may not register users",
            actor.id
        )));
    }
    let user = request.into_user()?;
    state.storage.insert_user(user.clone()).await?;

    tracing::info!(user_id = %user.id, role = %user.role, actor = %actor.id, "Registered user");
    Ok(Json(user))
}

/// Get a user
pub async fn get_user(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state
        .storage
        .get_user(&UserId::new(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", id)))?;
    Ok(Json(user))
}
