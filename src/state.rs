//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! configuration, the database client, and the session manager.

use crate::config::AppConfig;
use crate::db::Database;
use crate::session::SessionManager;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request handler; every field is a cheap `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded from the environment at startup.
    pub config: Arc<AppConfig>,
    /// Local or remote database, picked from `DATABASE_URL`.
    pub db: Arc<dyn Database>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Arc<dyn Database>) -> Self {
        let sessions = Arc::new(SessionManager::new(
            db.clone(),
            config.environment.is_production(),
        ));
        AppState {
            config,
            db,
            sessions,
        }
    }
}
