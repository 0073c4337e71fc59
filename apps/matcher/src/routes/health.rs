use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and scheduler state.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let scheduler = match &state.scheduler {
        Some(rx) => json!(*rx.borrow()),
        None => json!("disabled"),
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "matcher",
        "scheduler": scheduler
    }))
}
