pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/profiles", post(handlers::handle_save_profile))
        .route("/api/v1/profiles/:email", get(handlers::handle_get_profile))
        .route("/api/v1/profiles/:email/run", post(handlers::handle_run))
        .route(
            "/api/v1/profiles/:email/matches",
            get(handlers::handle_list_matches),
        )
        .with_state(state)
}
