use crate::config::Config;
use crate::db::connection::init_db;
use crate::db::repositories::{MemoryStateStore, PgStateStore, StateStore};
use crate::engine::VoteEngine;
use crate::sse::BroadcastHub;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{error, info, warn};

/// Process-scoped components, built once in `main` and handed to every
/// handler through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VoteEngine>,
    pub hub: Arc<BroadcastHub>,
    pub store: Arc<dyn StateStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn StateStore>, config: Config) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let engine = Arc::new(VoteEngine::new(Arc::clone(&store), Arc::clone(&hub)));

        AppState {
            engine,
            hub,
            store,
            config: Arc::new(config),
        }
    }

    pub fn spawn_health_check(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                if let Err(e) = store.ping().await {
                    error!("Vote state store health check failed: {}", e);
                }
            }
        })
    }
}

pub async fn connect_store(config: &Config) -> Result<Arc<dyn StateStore>, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = init_db(url, config.db_max_connections).await?;
            info!(key = %config.state_key, "using postgres vote state store");
            Ok(Arc::new(PgStateStore::new(pool, config.state_key.clone())))
        }
        None => {
            warn!("DATABASE_URL not set, vote state will not survive a restart");
            Ok(Arc::new(MemoryStateStore::new()))
        }
    }
}
