use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::models::Session;

pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// The session id carried by the request, if any.
pub fn read_session_cookie(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn build(value: String, max_age: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Cookie carrying the session id until the session expires.
pub fn session_cookie(session: &Session, now: i64, secure: bool) -> Cookie<'static> {
    build(session.id.clone(), session.max_age(now), secure)
}

/// Cookie passed to `Cookies::remove` to make the browser drop the session.
pub fn blank_session_cookie(secure: bool) -> Cookie<'static> {
    build(String::new(), 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> Session {
        Session {
            id: "abc".to_string(),
            user_id: "u".to_string(),
            expires_at,
            fresh: true,
        }
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie(&session(3_600), 0, false);
        assert_eq!(cookie.name(), "auth_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3_600)));
        assert_ne!(cookie.secure(), Some(true));

        let header = cookie.to_string();
        assert!(header.starts_with("auth_session=abc"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_secure_flag() {
        let cookie = session_cookie(&session(3_600), 0, true);
        assert_eq!(cookie.secure(), Some(true));
        assert!(cookie.to_string().contains("; Secure"));
    }

    #[test]
    fn test_expired_session_gets_zero_max_age() {
        let cookie = session_cookie(&session(100), 500, false);
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn test_blank_cookie() {
        let cookie = blank_session_cookie(false);
        assert_eq!(cookie.name(), "auth_session");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
