pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assistant::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jd/generate", post(handlers::handle_generate))
        .route(
            "/api/v1/conversations",
            post(handlers::handle_open_conversation),
        )
        .route(
            "/api/v1/conversations/upload",
            post(handlers::handle_upload_conversation),
        )
        .route(
            "/api/v1/conversations/:id",
            get(handlers::handle_get_conversation),
        )
        .route(
            "/api/v1/conversations/:id/messages",
            post(handlers::handle_ask),
        )
        .route(
            "/api/v1/conversations/:id/reset",
            post(handlers::handle_reset_conversation),
        )
        .with_state(state)
}
