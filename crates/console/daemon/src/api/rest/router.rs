//! REST API router configuration

use super::handlers::*;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the REST API router
pub fn create_router(state: AppState) -> Router {
    let workflow_routes = Router::new()
        .route(
            "/workflows/definitions",
            get(list_definitions).post(create_definition),
        )
        .route(
            "/workflows/definitions/:id",
            get(get_definition)
                .patch(update_definition)
                .delete(delete_definition),
        );

    let task_routes = Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/:task_id", get(get_task))
        .route("/tasks/:task_id/actions", post(submit_action))
        .route(
            "/tasks/:task_id/workflow",
            get(get_workflow_status).post(start_workflow),
        )
        .route("/tasks/:task_id/workflow/approvers", get(preview_approvers))
        .route("/tasks/:task_id/workflow/actions", get(list_workflow_actions));

    let project_routes = Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:id", get(get_project))
        .route("/projects/:id/package", get(get_package))
        .route("/projects/:id/package/submit", post(submit_package))
        .route("/projects/:id/package/accept", post(accept_package))
        .route("/projects/:id/package/activate", post(activate_package))
        .route("/projects/:id/package/send-back", post(send_back_package));

    let user_routes = Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user));

    Router::new()
        .route("/health", get(health_check))
        .merge(workflow_routes)
        .merge(task_routes)
        .merge(project_routes)
        .merge(user_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
