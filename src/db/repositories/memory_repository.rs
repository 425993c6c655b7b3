use crate::db::models::{VoteState, now_millis};
use crate::db::repositories::state_repository::StateStore;
use crate::error::StoreError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<Option<VoteState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<VoteState, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .clone()
            .unwrap_or_else(|| VoteState::empty(now_millis())))
    }

    async fn save(&self, state: &VoteState) -> Result<(), StoreError> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
