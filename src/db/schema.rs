use tracing::info;

use super::{Database, DatabaseError};

/// Tables the session layer relies on. Statements are idempotent and run on
/// every boot.
const MIGRATIONS: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS "user" (
        id TEXT NOT NULL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "session" (
        id TEXT NOT NULL PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
        expires_at INTEGER NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS session_user_id_idx ON "session"(user_id)"#,
];

pub async fn migrate(db: &dyn Database) -> Result<(), DatabaseError> {
    info!("Applying schema to {} database", db.kind());
    for statement in MIGRATIONS {
        db.execute(statement, &[]).await?;
    }
    Ok(())
}
