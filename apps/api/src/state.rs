//! Shared application state.

use std::sync::Arc;

use tally_checkout::CommitEngine;
use tally_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// Cloned into every handler; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<CommitEngine>,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// Wires the commit engine to `db` as its sale store.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let engine = CommitEngine::new(Arc::new(db.clone()))
            .with_max_attempts(config.commit.max_attempts);
        let jwt = JwtManager::new(&config.auth.jwt_secret);

        AppState {
            db,
            engine: Arc::new(engine),
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}
