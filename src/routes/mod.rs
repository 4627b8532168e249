//! HTTP route definitions.
//!
//! Procedures live under `/trpc`, plus a plain health check.

mod health_routes;
mod rpc_routes;

use crate::context::session_middleware;
use crate::state::AppState;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_cookies::CookieManagerLayer;

/// Creates the application router with all routes, the session middleware,
/// and the cookie manager it reads from.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(rpc_routes::routes())
        .merge(health_routes::routes())
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
