//! Application startup and server initialization.
//!
//! Connects the database selected by the configuration, applies the schema,
//! and serves the router on the configured port.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::db::{create_database, migrate};
use crate::routes;
use crate::state::AppState;

/// Builds the shared state: database client, schema, session manager. Expired
/// sessions left over from earlier runs are deleted.
pub async fn build_state(config: Arc<AppConfig>) -> Result<AppState, Box<dyn std::error::Error>> {
    let db = create_database(&config.database).await?;
    migrate(db.as_ref()).await?;
    let state = AppState::new(config, db);
    let removed = state.sessions.delete_expired_sessions().await?;
    info!("Removed {} expired sessions at startup", removed);
    Ok(state)
}

/// Initializes and runs the application server until it fails.
///
/// # Errors
///
/// Returns an error if the database cannot be reached, the listener cannot
/// bind, or the server hits a runtime error.
pub async fn run(config: Arc<AppConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone()).await?;
    let app = routes::create_router(state);

    let bind_address = config.bind_address();
    info!(
        "Starting server on {} ({})",
        bind_address, config.environment
    );
    let listener = TcpListener::bind(&bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
