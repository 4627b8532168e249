use serde::{Deserialize, Serialize};

/// A server-side login session, identified by the value of the session cookie.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
    /// Set when the expiry was just created or extended, meaning the client
    /// needs a new cookie.
    #[serde(skip)]
    pub fresh: bool,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Seconds until expiry, never negative.
    pub fn max_age(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }
}
