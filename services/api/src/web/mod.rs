pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_user;
pub use ws_handler::ws_handler;

use state::AppState;

/// Every route of the service. `/health` is open; the rest are scoped to the
/// user named by `x-user-id`.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/pages", get(rest::list_pages_handler))
        .route("/pages/{collection}", get(rest::page_view_handler))
        .route(
            "/collections/{collection}",
            get(rest::list_collection_handler).post(rest::create_record_handler),
        )
        .route("/schedule", get(rest::schedule_handler))
        .route("/schedule/blocks/{id}/toggle", post(rest::toggle_block_handler))
        .route("/projects", get(rest::projects_handler))
        .route("/projects/{id}/tasks", post(rest::create_task_handler))
        .route(
            "/projects/{id}/tasks/{task_id}/toggle",
            post(rest::toggle_task_handler),
        )
        .route("/progression", post(rest::progression_handler))
        .route("/insights/scores", get(rest::insight_scores_handler))
        .route("/insights", post(rest::insights_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn(require_user));

    Router::new()
        .route("/health", get(rest::health_handler))
        .merge(protected_routes)
        .with_state(app_state)
}
