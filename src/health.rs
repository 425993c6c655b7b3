use crate::startup::AppState;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health(Extension(app_state): Extension<AppState>) -> impl IntoResponse {
    let subscribers = app_state.hub.subscriber_count();
    let store = app_state.store.describe();

    match app_state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({
                "status": "ok",
                "subscribers": subscribers,
                "store": store,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({
                "status": "degraded",
                "subscribers": subscribers,
                "store": store,
                "error": e.to_string(),
            })),
        ),
    }
}
