use axum::{response::IntoResponse, Json};
use serde_json::json;

// axum handler for root
pub async fn root() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}
