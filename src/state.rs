use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::{Mutex, OnceCell};

use crate::auth::session::SessionStore;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub sessions: Arc<Mutex<SessionStore>>,
    /// Hash checked against when a login names no known user, so unknown
    /// and known users take the same bcrypt time.
    pub dummy_hash: Arc<OnceCell<String>>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let ttl = Duration::from_secs(config.auth.session_hours.saturating_mul(3600));
        Self {
            db,
            config,
            sessions: Arc::new(Mutex::new(SessionStore::new(ttl))),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }
}
