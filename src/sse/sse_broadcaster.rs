//! Fan-out of committed `VoteState` snapshots to every live subscriber.

use crate::db::models::VoteState;
use crate::error::HubError;
use crate::sse::models::SinkId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Anything that can take a serialized snapshot without blocking.
pub trait SnapshotSink: Send + Sync {
    fn deliver(&self, snapshot: Arc<str>) -> Result<(), HubError>;
}

impl SnapshotSink for mpsc::Sender<Arc<str>> {
    fn deliver(&self, snapshot: Arc<str>) -> Result<(), HubError> {
        self.try_send(snapshot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => HubError::Disconnected,
        })
    }
}

/// Registry of subscriber sinks. In-memory only; empty after a restart.
///
/// The lock is a std `RwLock` so that `unregister` can run from `Drop`.
/// It is never held across an await point.
#[derive(Default)]
pub struct BroadcastHub {
    sinks: RwLock<HashMap<SinkId, Arc<dyn SnapshotSink>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn SnapshotSink>) -> SinkId {
        let id = Uuid::new_v4();
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sink);
        debug!(sink_id = %id, "subscriber registered");
        id
    }

    /// Returns whether the sink was still registered.
    pub fn unregister(&self, id: SinkId) -> bool {
        let removed = self
            .sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(sink_id = %id, "subscriber unregistered");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Sends `state` to every registered sink and returns how many accepted it.
    ///
    /// Sinks that fail are dropped from the registry; the failure never
    /// reaches the caller.
    pub fn publish(&self, state: &VoteState) -> usize {
        let payload: Arc<str> = match serde_json::to_string(state) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "failed to serialize vote state for broadcast");
                return 0;
            }
        };

        let targets: Vec<(SinkId, Arc<dyn SnapshotSink>)> = self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sink) in targets {
            match sink.deliver(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(sink_id = %id, error = %e, "dropping subscriber after failed delivery");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
            for id in failed {
                sinks.remove(&id);
            }
        }

        debug!(delivered, "published vote state");
        delivered
    }
}
