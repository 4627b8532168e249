//! Per-request context handed to procedure handlers.
//!
//! The context is created at the start of every request with no user and no
//! session; [`session_middleware`] fills both in when the request carries a
//! valid session cookie.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use tower_cookies::Cookies;
use tracing::{debug, warn};

use crate::models::{Session, User};
use crate::session::read_session_cookie;
use crate::state::AppState;

/// The incoming request as seen by procedures.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Absent when the server was not started with connect info.
    pub client_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub event: RequestEvent,
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl Context {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Builds an anonymous context for the request.
pub fn create_context(parts: &Parts) -> Context {
    Context {
        event: RequestEvent {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            client_addr: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        },
        user: None,
        session: None,
    }
}

/// Resolves the session cookie into `user`/`session` and stores the context in
/// the request extensions. Also rewrites the cookie when the session was
/// extended, and clears it when the session is gone. Handlers that set the
/// cookie themselves (login, logout) override both.
pub async fn session_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut context = create_context(&parts);

    if let Some(session_id) = read_session_cookie(&cookies) {
        match state.sessions.validate_session(&session_id).await {
            Ok(Some((session, user))) => {
                debug!("Request authenticated as '{}'", user.username);
                if session.fresh {
                    cookies.add(state.sessions.session_cookie(&session));
                }
                context.user = Some(user);
                context.session = Some(session);
            }
            Ok(None) => {
                debug!("Unknown or expired session cookie; clearing it.");
                cookies.remove(state.sessions.blank_session_cookie());
            }
            Err(e) => warn!("Failed to validate session: {}", e),
        }
    }

    parts.extensions.insert(context);
    next.run(Request::from_parts(parts, body)).await
}

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Context>()
            .cloned()
            .unwrap_or_else(|| create_context(parts)))
    }
}
