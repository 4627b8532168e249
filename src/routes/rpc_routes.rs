//! Remote procedure endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::rpc::procedures;
use crate::rpc::RPC_PREFIX;
use crate::state::AppState;

/// Registers the auth procedures: mutations are POST, queries are GET.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{}/login", RPC_PREFIX), post(procedures::login))
        .route(&format!("{}/register", RPC_PREFIX), post(procedures::register))
        .route(&format!("{}/logout", RPC_PREFIX), get(procedures::logout))
}
