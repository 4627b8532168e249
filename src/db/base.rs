use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::local_database::LocalDatabase;
use super::remote_database::RemoteDatabase;
use super::value::{Row, Value};
use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("remote database returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("failed to decode result: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::Query(e.to_string())
    }
}

/// Which driver a connection URL selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    /// SQLite file on local disk (or in memory).
    Local,
    /// libSQL server reached over HTTP.
    Remote,
}

impl DatabaseKind {
    pub fn from_url(url: &str) -> Self {
        if url.contains("file:") || url.contains(":memory:") {
            DatabaseKind::Local
        } else {
            DatabaseKind::Remote
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Local => f.write_str("local"),
            DatabaseKind::Remote => f.write_str("remote"),
        }
    }
}

/// The Database trait abstracts over the two drivers.
/// Parameters bind positionally to `?` placeholders.
#[async_trait]
pub trait Database: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DatabaseError>;

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError>;

    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DatabaseError> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }
}

/// Creates the driver matching the configured URL.
pub async fn create_database(config: &DatabaseConfig) -> Result<Arc<dyn Database>, DatabaseError> {
    match DatabaseKind::from_url(&config.url) {
        DatabaseKind::Local => {
            info!("Found file local database. Using SQLite driver.");
            Ok(Arc::new(LocalDatabase::connect(&config.url).await?))
        }
        DatabaseKind::Remote => {
            info!("Found remote database. Using libSQL HTTP driver.");
            Ok(Arc::new(RemoteDatabase::new(
                &config.url,
                config.auth_token.clone(),
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url() {
        assert_eq!(DatabaseKind::from_url("file:local.db"), DatabaseKind::Local);
        assert_eq!(DatabaseKind::from_url("file:./data/app.db"), DatabaseKind::Local);
        assert_eq!(DatabaseKind::from_url(":memory:"), DatabaseKind::Local);
        assert_eq!(
            DatabaseKind::from_url("libsql://app-org.turso.io"),
            DatabaseKind::Remote
        );
        assert_eq!(
            DatabaseKind::from_url("http://127.0.0.1:8080"),
            DatabaseKind::Remote
        );
    }

    #[tokio::test]
    async fn test_create_database_picks_local_driver() {
        let config = DatabaseConfig {
            url: "file::memory:".to_string(),
            auth_token: None,
        };
        let db = create_database(&config).await.expect("in-memory db");
        assert_eq!(db.kind(), DatabaseKind::Local);
    }

    #[tokio::test]
    async fn test_create_database_picks_remote_driver() {
        let config = DatabaseConfig {
            url: "libsql://app-org.turso.io".to_string(),
            auth_token: Some("token".to_string()),
        };
        let db = create_database(&config).await.expect("remote db");
        assert_eq!(db.kind(), DatabaseKind::Remote);
    }

    #[tokio::test]
    async fn test_create_database_rejects_unknown_scheme() {
        let config = DatabaseConfig {
            url: "postgres://localhost/app".to_string(),
            auth_token: None,
        };
        assert!(matches!(
            create_database(&config).await,
            Err(DatabaseError::Connect(_))
        ));
    }
}
