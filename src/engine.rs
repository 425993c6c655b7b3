use crate::db::models::{VoteOption, VoteState, now_millis};
use crate::db::repositories::StateStore;
use crate::error::VoteError;
use crate::sse::BroadcastHub;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Cast { option_id: String },
    Retract { option_id: String },
    AddOption { text: String },
}

/// The only writer of the shared `VoteState`.
///
/// `apply` holds `write_lock` across load, validate, save and publish, so two
/// actions never interleave their store round-trips inside this process.
pub struct VoteEngine {
    store: Arc<dyn StateStore>,
    hub: Arc<BroadcastHub>,
    write_lock: Mutex<()>,
}

impl VoteEngine {
    pub fn new(store: Arc<dyn StateStore>, hub: Arc<BroadcastHub>) -> Self {
        VoteEngine {
            store,
            hub,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn current(&self) -> Result<VoteState, VoteError> {
        Ok(self.store.load().await?)
    }

    pub async fn apply(&self, action: Action, identity: &str) -> Result<VoteState, VoteError> {
        // Blank names are rejected; anything else is an opaque key, kept as sent.
        if identity.trim().is_empty() {
            return Err(VoteError::MissingIdentity);
        }

        let _writer = self.write_lock.lock().await;

        let mut state = self.store.load().await?;
        mutate(&mut state, &action, identity, now_millis())?;

        self.store.save(&state).await?;
        info!(user = %identity, action = ?action, "vote state committed");

        // Subscribers get what the store now holds; the committed copy is the
        // fallback if the re-read fails.
        let snapshot = match self.store.load().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "re-read after save failed, publishing committed state");
                state.clone()
            }
        };
        self.hub.publish(&snapshot);

        Ok(state)
    }
}

fn mutate(
    state: &mut VoteState,
    action: &Action,
    identity: &str,
    now_ms: i64,
) -> Result<(), VoteError> {
    match action {
        Action::Cast { option_id } => {
            let option = state
                .option_mut(option_id)
                .ok_or(VoteError::OptionNotFound)?;
            if option.has_voter(identity) {
                return Err(VoteError::AlreadyVoted);
            }
            option.voters.push(identity.to_string());
            option.votes += 1;
        }
        Action::Retract { option_id } => {
            let option = state
                .option_mut(option_id)
                .ok_or(VoteError::OptionNotFound)?;
            if !option.has_voter(identity) {
                return Err(VoteError::NotVoted);
            }
            option.voters.retain(|voter| voter != identity);
            option.votes = option.votes.saturating_sub(1);
        }
        Action::AddOption { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(VoteError::EmptyText);
            }
            let id = state.next_option_id(now_ms);
            state.options.push(VoteOption::new(
                id,
                text.to_string(),
                identity.to_string(),
                now_ms,
            ));
        }
    }

    state.touch(now_ms);
    Ok(())
}
