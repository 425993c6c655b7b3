use crate::config::Config;
use crate::health::health;
use crate::sse::events_sse;
use crate::startup::{AppState, connect_store};
use crate::votes::{get_votes, submit_action};
use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod engine;
mod error;
mod health;
mod sse;
mod startup;
mod votes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize tracing, `info` unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().inspect_err(|e| {
        error!(error = %e, "invalid configuration");
    })?;
    let store = connect_store(&config).await.inspect_err(|e| {
        error!(error = %e, "failed to connect vote state store");
    })?;

    let addr = config.bind_addr;
    let app_state = AppState::new(store, config);
    app_state.spawn_health_check();

    let app = router(app_state);

    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| error!(error = %e, %addr, "unable to bind listener"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/votes", get(get_votes).post(submit_action))
        .route("/api/events", get(events_sse))
        .route("/api/health", get(health))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::POST,
                    axum::http::Method::GET,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::VoteState;
    use crate::db::repositories::{MemoryStateStore, StateStore};
    use crate::error::StoreError;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use futures::StreamExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(Arc::new(MemoryStateStore::new()), Config::default())
    }

    struct UnreachableStore;

    #[async_trait]
    impl StateStore for UnreachableStore {
        async fn load(&self) -> Result<VoteState, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn save(&self, _state: &VoteState) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        fn describe(&self) -> String {
            "unreachable".to_string()
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_action(body: Value) -> Request<Body> {
        Request::post("/api/votes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn bootstrap_fetch_returns_empty_state() {
        let response = router(test_state())
            .oneshot(Request::get("/api/votes").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["options"], json!([]));
        assert!(body["lastUpdate"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn add_vote_and_retract_over_http() {
        let state = test_state();

        let response = router(state.clone())
            .oneshot(post_action(json!({
                "action": "addOption",
                "newOption": "Pizza",
                "userName": "alice"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let id = body["data"]["options"][0]["id"].as_str().unwrap().to_string();

        let response = router(state.clone())
            .oneshot(post_action(json!({
                "action": "vote",
                "optionId": id,
                "userName": "bob"
            })))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["options"][0]["votes"], 1);
        assert_eq!(body["data"]["options"][0]["voters"], json!(["bob"]));

        let response = router(state.clone())
            .oneshot(post_action(json!({
                "action": "vote",
                "optionId": id,
                "userName": "bob"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "You have already voted for this option" })
        );

        let response = router(state)
            .oneshot(post_action(json!({
                "action": "removeVote",
                "optionId": id,
                "userName": "bob"
            })))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["options"][0]["votes"], 0);
    }

    #[tokio::test]
    async fn error_statuses_follow_the_error_kind() {
        let state = test_state();

        let cases = [
            (json!({ "action": "vote", "optionId": "1" }), StatusCode::BAD_REQUEST, "Name is required"),
            (
                json!({ "action": "vote", "optionId": "404", "userName": "carol" }),
                StatusCode::NOT_FOUND,
                "Option not found",
            ),
            (
                json!({ "action": "addOption", "newOption": "  ", "userName": "carol" }),
                StatusCode::BAD_REQUEST,
                "Option text is required",
            ),
            (
                json!({ "action": "explode", "userName": "carol" }),
                StatusCode::BAD_REQUEST,
                "Invalid action",
            ),
        ];

        for (payload, status, message) in cases {
            let response = router(state.clone()).oneshot(post_action(payload)).await.unwrap();
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await, json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn store_outage_is_a_generic_server_error() {
        let state = AppState::new(Arc::new(UnreachableStore), Config::default());

        let response = router(state.clone())
            .oneshot(Request::get("/api/votes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Internal server error" }));

        let response = router(state.clone())
            .oneshot(post_action(json!({
                "action": "addOption",
                "newOption": "Pizza",
                "userName": "alice"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Internal server error" }));

        let response = router(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "degraded");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let request = Request::post("/api/votes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router(test_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "Invalid request" }));
    }

    #[tokio::test]
    async fn live_channel_requires_a_name() {
        let response = router(test_state())
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn live_channel_streams_connected_then_snapshots() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::get("/api/events?userName=erin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache, no-transform");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(state.hub.subscriber_count(), 1);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).starts_with("data: {\"type\":\"connected\"}"));

        state
            .engine
            .apply(
                crate::engine::Action::AddOption {
                    text: "Pizza".into(),
                },
                "alice",
            )
            .await
            .unwrap();

        let pushed = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8_lossy(&pushed).to_string();
        let json_line = frame.trim().strip_prefix("data: ").unwrap();
        let snapshot: Value = serde_json::from_str(json_line).unwrap();
        assert_eq!(snapshot["options"][0]["text"], "Pizza");

        drop(body);
        assert_eq!(state.hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_live_channel_leaves_no_registration() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::get("/api/events?userName=erin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(state.hub.subscriber_count(), 1);

        drop(response);
        assert_eq!(state.hub.subscriber_count(), 0);
        assert_eq!(state.hub.publish(&state.engine.current().await.unwrap()), 0);
    }

    #[tokio::test]
    async fn health_reports_store_and_subscribers() {
        let response = router(test_state())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["subscribers"], 0);
    }

    #[tokio::test]
    async fn unknown_routes_fall_through_to_404() {
        let response = router(test_state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
