use crate::db::connection::{DbPool, get_pool_stats};
use crate::db::models::{VoteState, now_millis};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::types::Json;

/// Durable home of the single shared `VoteState` document.
///
/// Plain get/set: there is no version check here, so callers that
/// read-modify-write must serialize themselves (the engine does).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the persisted state, or a fresh empty one if nothing was saved yet.
    async fn load(&self) -> Result<VoteState, StoreError>;

    async fn save(&self, state: &VoteState) -> Result<(), StoreError>;

    /// Cheap reachability probe used by the health task and `/api/health`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String;
}

pub struct PgStateStore {
    pool: DbPool,
    key: String,
}

impl PgStateStore {
    pub fn new(pool: DbPool, key: impl Into<String>) -> Self {
        PgStateStore {
            pool,
            key: key.into(),
        }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn load(&self) -> Result<VoteState, StoreError> {
        let row = sqlx::query("SELECT data FROM vote_state WHERE key = $1")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(state): Json<VoteState> = row.try_get("data")?;
                Ok(state)
            }
            None => Ok(VoteState::empty(now_millis())),
        }
    }

    async fn save(&self, state: &VoteState) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO vote_state (key, data, updated_at)
            VALUES ($1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT (key) DO UPDATE
            SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&self.key)
        .bind(Json(state))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.pool.acquire().await?;
        drop(conn);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("postgres ({})", get_pool_stats(&self.pool))
    }
}
