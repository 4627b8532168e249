//! Accounts and login sessions stored in the application database.
//!
//! Sessions are opaque random ids handed to the browser in the
//! `auth_session` cookie and looked up on every request.

pub mod cookie;
pub mod manager;
pub mod password;

use thiserror::Error;

use crate::db::DatabaseError;

pub use cookie::{read_session_cookie, SESSION_COOKIE_NAME};
pub use manager::SessionManager;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("username already taken")]
    UsernameTaken,
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
