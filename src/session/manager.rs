use std::sync::Arc;

use chrono::Utc;
use tower_cookies::Cookie;
use tracing::{debug, info};
use uuid::Uuid;

use super::cookie::{blank_session_cookie, session_cookie};
use super::password::{hash_password, verify_password};
use super::SessionError;
use crate::db::{Database, Row};
use crate::models::{Session, User};

const DAY: i64 = 24 * 60 * 60;
/// Lifetime of a new or extended session.
pub const SESSION_LIFETIME: i64 = 30 * DAY;
/// Sessions closer than this to expiry are extended on use.
pub const SESSION_REFRESH_WINDOW: i64 = 15 * DAY;

/// Creates, validates, and invalidates sessions, and owns the credential checks
/// behind login and register.
pub struct SessionManager {
    db: Arc<dyn Database>,
    secure_cookies: bool,
}

/// 3-31 characters of lowercase letters, digits, `_` or `-`.
pub fn validate_username(username: &str) -> Result<(), SessionError> {
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if (3..=31).contains(&username.len()) && valid_chars {
        Ok(())
    } else {
        Err(SessionError::InvalidInput(
            "Username must be 3-31 characters of a-z, 0-9, _ or -".to_string(),
        ))
    }
}

pub fn validate_password(password: &str) -> Result<(), SessionError> {
    if (6..=255).contains(&password.chars().count()) {
        Ok(())
    } else {
        Err(SessionError::InvalidInput(
            "Password must be 6-255 characters".to_string(),
        ))
    }
}

/// Compares `password` with the stored hash on a blocking thread. Without a
/// stored hash the password is hashed anyway, so unknown usernames cost the
/// same Argon2 work as known ones, and the result is a mismatch.
async fn check_password(password: &str, stored_hash: Option<String>) -> Result<bool, SessionError> {
    let owned = password.to_string();
    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&owned, &hash),
        None => hash_password(&owned).map(|_| false),
    })
    .await
    .map_err(|e| SessionError::Hash(e.to_string()))?
}

fn user_from_row(row: &Row) -> Result<User, SessionError> {
    Ok(User {
        id: row.get_text("id")?,
        username: row.get_text("username")?,
    })
}

impl SessionManager {
    pub fn new(db: Arc<dyn Database>, secure_cookies: bool) -> Self {
        SessionManager { db, secure_cookies }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, SessionError> {
        self.db
            .query_one(
                r#"SELECT id, username FROM "user" WHERE username = ?"#,
                &[username.into()],
            )
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, SessionError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.find_user_by_username(username).await?.is_some() {
            return Err(SessionError::UsernameTaken);
        }

        // Keep Argon2 off the async workers.
        let owned = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&owned))
            .await
            .map_err(|e| SessionError::Hash(e.to_string()))??;

        // A concurrent register may have claimed the name since the check above.
        let user = User::new(Uuid::new_v4().simple().to_string(), username);
        let inserted = self
            .db
            .execute(
                r#"INSERT INTO "user" (id, username, password_hash) VALUES (?, ?, ?)
                   ON CONFLICT(username) DO NOTHING"#,
                &[
                    user.id.as_str().into(),
                    user.username.as_str().into(),
                    password_hash.into(),
                ],
            )
            .await?;
        if inserted == 0 {
            return Err(SessionError::UsernameTaken);
        }

        info!("Registered user '{}'", user.username);
        Ok(user)
    }

    /// Returns the user when the password matches. Unknown usernames and wrong
    /// passwords produce the same error.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let row = self
            .db
            .query_one(
                r#"SELECT id, username, password_hash FROM "user" WHERE username = ?"#,
                &[username.into()],
            )
            .await?;

        let stored_hash = row
            .as_ref()
            .map(|row| row.get_text("password_hash"))
            .transpose()?;
        let matches = check_password(password, stored_hash).await?;

        match row {
            Some(row) if matches => user_from_row(&row),
            Some(_) => {
                debug!("Wrong password for user '{}'", username);
                Err(SessionError::InvalidCredentials)
            }
            None => {
                debug!("Login attempt for unknown user '{}'", username);
                Err(SessionError::InvalidCredentials)
            }
        }
    }

    /// Starts a session for the user. Expired sessions of all users are
    /// swept first.
    pub async fn create_session(&self, user_id: &str) -> Result<Session, SessionError> {
        self.delete_expired_sessions().await?;
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            expires_at: Utc::now().timestamp() + SESSION_LIFETIME,
            fresh: true,
        };
        self.db
            .execute(
                r#"INSERT INTO "session" (id, user_id, expires_at) VALUES (?, ?, ?)"#,
                &[
                    session.id.as_str().into(),
                    session.user_id.as_str().into(),
                    session.expires_at.into(),
                ],
            )
            .await?;
        debug!("Created session for user_id '{}'", user_id);
        Ok(session)
    }

    /// Looks up a session id. Expired sessions are deleted and reported as
    /// absent; sessions inside the refresh window get a new expiry and come
    /// back with `fresh` set.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<(Session, User)>, SessionError> {
        let row = self
            .db
            .query_one(
                r#"SELECT s.id AS session_id, s.expires_at, u.id, u.username
                   FROM "session" s JOIN "user" u ON u.id = s.user_id
                   WHERE s.id = ?"#,
                &[session_id.into()],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = user_from_row(&row)?;
        let mut session = Session {
            id: row.get_text("session_id")?,
            user_id: user.id.clone(),
            expires_at: row.get_i64("expires_at")?,
            fresh: false,
        };

        let now = Utc::now().timestamp();
        if session.is_expired(now) {
            debug!("Session for '{}' expired; deleting", user.username);
            self.invalidate_session(&session.id).await?;
            return Ok(None);
        }

        if session.expires_at - now < SESSION_REFRESH_WINDOW {
            session.expires_at = now + SESSION_LIFETIME;
            session.fresh = true;
            self.db
                .execute(
                    r#"UPDATE "session" SET expires_at = ? WHERE id = ?"#,
                    &[session.expires_at.into(), session.id.as_str().into()],
                )
                .await?;
        }

        Ok(Some((session, user)))
    }

    pub async fn invalidate_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.db
            .execute(r#"DELETE FROM "session" WHERE id = ?"#, &[session_id.into()])
            .await?;
        Ok(())
    }

    /// Removes every session past its expiry. Returns how many were removed.
    pub async fn delete_expired_sessions(&self) -> Result<u64, SessionError> {
        let removed = self
            .db
            .execute(
                r#"DELETE FROM "session" WHERE expires_at <= ?"#,
                &[Utc::now().timestamp().into()],
            )
            .await?;
        if removed > 0 {
            debug!("Deleted {} expired sessions", removed);
        }
        Ok(removed)
    }

    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        session_cookie(session, Utc::now().timestamp(), self.secure_cookies)
    }

    pub fn blank_session_cookie(&self) -> Cookie<'static> {
        blank_session_cookie(self.secure_cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::local_database::LocalDatabase;
    use crate::db::migrate;

    async fn manager() -> SessionManager {
        let db = LocalDatabase::connect("file::memory:").await.unwrap();
        migrate(&db).await.unwrap();
        SessionManager::new(Arc::new(db), false)
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("adam").is_ok());
        assert!(validate_username("a_b-9").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Adam").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(32)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let manager = manager().await;
        let user = manager.create_user("adam", "password1").await.unwrap();
        assert_eq!(user.username, "adam");

        let verified = manager.verify_credentials("adam", "password1").await.unwrap();
        assert_eq!(verified, user);

        assert!(matches!(
            manager.verify_credentials("adam", "password2").await,
            Err(SessionError::InvalidCredentials)
        ));
        assert!(matches!(
            manager.verify_credentials("eve", "password1").await,
            Err(SessionError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let manager = manager().await;
        manager.create_user("adam", "password1").await.unwrap();
        assert!(matches!(
            manager.create_user("adam", "password2").await,
            Err(SessionError::UsernameTaken)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_of_one_name() {
        let manager = Arc::new(manager().await);
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let manager = manager.clone();
            tasks.spawn(async move { manager.create_user("adam", "admin123").await });
        }

        let mut created = 0;
        let mut taken = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(_) => created += 1,
                Err(SessionError::UsernameTaken) => taken += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((created, taken), (1, 7));
    }

    #[tokio::test]
    async fn test_unknown_user_still_hashes() {
        assert!(!check_password("password1", None).await.unwrap());

        let hash = hash_password("password1").unwrap();
        assert!(check_password("password1", Some(hash.clone())).await.unwrap());
        assert!(!check_password("password2", Some(hash)).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let manager = manager().await;
        let user = manager.create_user("adam", "password1").await.unwrap();
        let session = manager.create_session(&user.id).await.unwrap();
        assert!(session.fresh);

        let (validated, session_user) = manager
            .validate_session(&session.id)
            .await
            .unwrap()
            .expect("session should be valid");
        assert_eq!(session_user, user);
        assert_eq!(validated.id, session.id);
        assert!(!validated.fresh);

        manager.invalidate_session(&session.id).await.unwrap();
        assert!(manager.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let manager = manager().await;
        let user = manager.create_user("adam", "password1").await.unwrap();
        let session = manager.create_session(&user.id).await.unwrap();
        manager
            .database()
            .execute(
                r#"UPDATE "session" SET expires_at = ? WHERE id = ?"#,
                &[(Utc::now().timestamp() - 1).into(), session.id.as_str().into()],
            )
            .await
            .unwrap();

        assert!(manager.validate_session(&session.id).await.unwrap().is_none());
        let remaining = manager
            .database()
            .query(r#"SELECT id FROM "session""#, &[])
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_session_near_expiry_is_extended() {
        let manager = manager().await;
        let user = manager.create_user("adam", "password1").await.unwrap();
        let session = manager.create_session(&user.id).await.unwrap();
        let soon = Utc::now().timestamp() + DAY;
        manager
            .database()
            .execute(
                r#"UPDATE "session" SET expires_at = ? WHERE id = ?"#,
                &[soon.into(), session.id.as_str().into()],
            )
            .await
            .unwrap();

        let (extended, _) = manager.validate_session(&session.id).await.unwrap().unwrap();
        assert!(extended.fresh);
        assert!(extended.expires_at > soon + SESSION_REFRESH_WINDOW);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_swept_on_login() {
        let manager = manager().await;
        let user = manager.create_user("adam", "password1").await.unwrap();
        let stale = manager.create_session(&user.id).await.unwrap();
        let live = manager.create_session(&user.id).await.unwrap();
        manager
            .database()
            .execute(
                r#"UPDATE "session" SET expires_at = ? WHERE id = ?"#,
                &[(Utc::now().timestamp() - 10).into(), stale.id.as_str().into()],
            )
            .await
            .unwrap();

        let fresh = manager.create_session(&user.id).await.unwrap();

        let mut ids: Vec<String> = manager
            .database()
            .query(r#"SELECT id FROM "session""#, &[])
            .await
            .unwrap()
            .iter()
            .map(|row| row.get_text("id").unwrap())
            .collect();
        ids.sort();
        let mut expected = vec![live.id, fresh.id];
        expected.sort();
        assert_eq!(ids, expected);
        assert_eq!(manager.delete_expired_sessions().await.unwrap(), 0);
    }
}
