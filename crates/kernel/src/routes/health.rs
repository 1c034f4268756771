//! Health check route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db;
use crate::state::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(health))
}

/// Liveness plus a database ping.
async fn health(State(state): State<AppState>) -> Response {
    if db::check_health(state.db()).await {
        Json(serde_json::json!({ "status": "ok" })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded", "database": "unreachable" })),
        )
            .into_response()
    }
}
