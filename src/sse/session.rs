//! Per-client live channel: `Connecting -> Open -> Closed`.
//!
//! Both exit paths (client hang-up drops the stream, hub eviction ends it)
//! funnel into `SessionInner::close`, which runs its teardown once.

use crate::db::models::now_millis;
use crate::sse::models::{SessionMessage, SessionState, SinkId};
use crate::sse::sse_broadcaster::BroadcastHub;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

struct SessionInner {
    hub: Arc<BroadcastHub>,
    sink_id: SinkId,
    user: String,
    state: Mutex<SessionState>,
    closed: AtomicBool,
}

impl SessionInner {
    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self, reason: &'static str) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.set_state(SessionState::Closed);
        self.hub.unregister(self.sink_id);
        info!(sink_id = %self.sink_id, user = %self.user, reason, "live session closed");
    }
}

pub struct StreamingSession {
    inner: Arc<SessionInner>,
    messages: Pin<Box<dyn Stream<Item = SessionMessage> + Send>>,
}

impl StreamingSession {
    /// Registers a new subscriber with `hub` and returns its message stream.
    ///
    /// The first item is always `SessionMessage::Connected`.
    pub fn open(
        hub: Arc<BroadcastHub>,
        user: impl Into<String>,
        buffer: usize,
        heartbeat: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<str>>(buffer.max(1));
        let sink_id = hub.register(Arc::new(tx));

        let inner = Arc::new(SessionInner {
            hub,
            sink_id,
            user: user.into(),
            state: Mutex::new(SessionState::Connecting),
            closed: AtomicBool::new(false),
        });
        info!(sink_id = %sink_id, user = %inner.user, "live session connecting");

        let session = Arc::clone(&inner);
        let messages = async_stream::stream! {
            session.set_state(SessionState::Open);
            yield SessionMessage::Connected;

            let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let next = tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Some(snapshot) => Some(SessionMessage::Snapshot(snapshot)),
                        None => {
                            debug!(sink_id = %session.sink_id, "hub released subscriber");
                            None
                        }
                    },
                    _ = ticker.tick() => Some(SessionMessage::Heartbeat(now_millis())),
                };

                match next {
                    Some(message) => yield message,
                    None => break,
                }
            }

            session.close("stream ended");
        };

        StreamingSession {
            inner,
            messages: Box::pin(messages),
        }
    }

    pub fn sink_id(&self) -> SinkId {
        self.inner.sink_id
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }
}

impl Stream for StreamingSession {
    type Item = SessionMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.state() == SessionState::Closed {
            return Poll::Ready(None);
        }
        self.messages.as_mut().poll_next(cx)
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.inner.close("transport dropped");
    }
}
