use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub type SinkId = Uuid;

/// One frame on the live channel, before it is rendered as an SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    Connected,
    Heartbeat(i64),
    Snapshot(Arc<str>),
}

impl SessionMessage {
    pub fn connected_payload() -> String {
        json!({ "type": "connected" }).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}
