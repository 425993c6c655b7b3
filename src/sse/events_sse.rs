use crate::error::VoteError;
use crate::sse::models::SessionMessage;
use crate::sse::session::StreamingSession;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Query},
    http::{HeaderName, HeaderValue, header::CACHE_CONTROL},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
}

fn into_event(message: SessionMessage) -> Event {
    match message {
        SessionMessage::Connected => Event::default().data(SessionMessage::connected_payload()),
        SessionMessage::Heartbeat(at) => Event::default().comment(format!("heartbeat {at}")),
        SessionMessage::Snapshot(snapshot) => Event::default().data(snapshot),
    }
}

/// Live channel: connected marker, heartbeat comments, and a full
/// `VoteState` after every committed action.
pub async fn events_sse(
    Extension(app_state): Extension<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, VoteError> {
    let user = query
        .user_name
        .filter(|name| !name.trim().is_empty())
        .ok_or(VoteError::MissingIdentity)?;

    let session = StreamingSession::open(
        app_state.hub.clone(),
        user,
        app_state.config.sink_buffer,
        app_state.config.heartbeat_interval,
    );
    debug!(
        sink_id = %session.sink_id(),
        subscribers = app_state.hub.subscriber_count(),
        "live channel opened"
    );
    let stream = session.map(|message| Ok::<_, Infallible>(into_event(message)));

    Ok((
        [
            (CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(stream),
    ))
}
