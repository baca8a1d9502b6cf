use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::provider::{DynIdentityProvider, HttpIdentityProvider};
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::store::sqlite::{SqlitePostStore, SqliteUserStore};
use crate::store::{DynPostStore, DynUserStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: DynUserStore,
    pub posts: DynPostStore,
    pub sessions: Arc<Mutex<SessionStore>>,
    /// None until a provider is configured; delegated routes then 404.
    pub provider: Option<DynIdentityProvider>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire the SQLite stores and in-memory sessions onto a migrated pool.
    pub fn build(config: Config, pool: DbPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();

        let provider: Option<DynIdentityProvider> = if config.provider.is_configured() {
            Some(Arc::new(HttpIdentityProvider::from_config(
                http.clone(),
                &config.provider,
            )?))
        } else {
            None
        };

        let session_ttl = Duration::from_secs(config.auth.session_hours * 3600);

        Ok(Self {
            users: Arc::new(SqliteUserStore::new(pool.clone())),
            posts: Arc::new(SqlitePostStore::new(pool)),
            sessions: Arc::new(Mutex::new(SessionStore::new(session_ttl))),
            provider,
            http,
            config,
        })
    }
}
