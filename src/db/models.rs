use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOption {
    pub id: String,
    pub text: String,
    pub votes: u64,
    pub voters: Vec<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl VoteOption {
    pub fn new(id: String, text: String, created_by: String, created_at: i64) -> Self {
        VoteOption {
            id,
            text,
            votes: 0,
            voters: Vec::new(),
            created_by,
            created_at,
        }
    }

    pub fn has_voter(&self, voter: &str) -> bool {
        self.voters.iter().any(|v| v == voter)
    }
}

/// The whole shared document: options in creation order plus the time of the
/// last committed mutation (epoch millis).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    pub options: Vec<VoteOption>,
    pub last_update: i64,
}

impl VoteState {
    pub fn empty(now_ms: i64) -> Self {
        VoteState {
            options: Vec::new(),
            last_update: now_ms,
        }
    }

    pub fn option(&self, id: &str) -> Option<&VoteOption> {
        self.options.iter().find(|opt| opt.id == id)
    }

    pub fn option_mut(&mut self, id: &str) -> Option<&mut VoteOption> {
        self.options.iter_mut().find(|opt| opt.id == id)
    }

    /// Timestamp-derived id, bumped past any id already taken in this state.
    pub fn next_option_id(&self, now_ms: i64) -> String {
        let mut candidate = now_ms;
        while self.option(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Moves `last_update` forward, never backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_update = self.last_update.max(now_ms);
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
