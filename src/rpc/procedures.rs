//! Server side of the `login`, `logout` and `register` procedures.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tower_cookies::Cookies;
use tracing::{info, instrument};

use super::{AuthOutput, Credentials, LogoutOutput, RpcSuccess};
use crate::context::Context;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Mutation: checks the credentials and starts a session.
#[instrument(name = "procedure.login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    input: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<RpcSuccess<AuthOutput>>, HTTPError> {
    let Json(credentials) = input?;
    let user = state
        .sessions
        .verify_credentials(&credentials.username, &credentials.password)
        .await?;
    let session = state.sessions.create_session(&user.id).await?;

    cookies.add(state.sessions.session_cookie(&session));

    info!("User '{}' logged in", user.username);
    Ok(Json(RpcSuccess::new(AuthOutput { user: Some(user) })))
}

/// Mutation: creates the account and logs it in.
#[instrument(name = "procedure.register", skip_all)]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    input: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<RpcSuccess<AuthOutput>>, HTTPError> {
    let Json(credentials) = input?;
    let user = state
        .sessions
        .create_user(&credentials.username, &credentials.password)
        .await?;
    let session = state.sessions.create_session(&user.id).await?;
    cookies.add(state.sessions.session_cookie(&session));

    Ok(Json(RpcSuccess::new(AuthOutput { user: Some(user) })))
}

/// Query: ends the current session. Reports `success: false` when the request
/// carries no session.
#[instrument(name = "procedure.logout", skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    context: Context,
) -> Result<Json<RpcSuccess<LogoutOutput>>, HTTPError> {
    let Some(session) = context.session else {
        return Ok(Json(RpcSuccess::new(LogoutOutput { success: false })));
    };

    state.sessions.invalidate_session(&session.id).await?;
    cookies.remove(state.sessions.blank_session_cookie());
    if let Some(user) = &context.user {
        info!("User '{}' logged out", user.username);
    }

    Ok(Json(RpcSuccess::new(LogoutOutput { success: true })))
}
