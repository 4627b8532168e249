use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::base::{Database, DatabaseError, DatabaseKind};
use super::value::{Row, Value};

/// A `Database` backed by a SQLite file through a sqlx pool.
pub struct LocalDatabase {
    pool: SqlitePool,
}

/// Strips the `file:` prefix and any URI query, leaving a filesystem path
/// or `:memory:`.
fn file_path(url: &str) -> &str {
    let path = url.strip_prefix("file:").unwrap_or(url);
    path.split('?').next().unwrap_or(path)
}

impl LocalDatabase {
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let path = file_path(url);
        info!("Opening SQLite database at '{}'", path);

        let pool = if path == ":memory:" {
            // Every connection to :memory: is a separate database, so keep exactly one alive.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DatabaseError::Connect(e.to_string()))?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(Option::<Duration>::None)
                .max_lifetime(Option::<Duration>::None)
                .connect_with(options)
                .await
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
        }
        .map_err(|e| DatabaseError::Connect(e.to_string()))?;

        Ok(LocalDatabase { pool })
    }

    fn bind_params<'q>(
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
        params: &'q [Value],
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<String>),
                Value::Integer(i) => query.bind(*i),
                Value::Real(x) => query.bind(*x),
                Value::Text(s) => query.bind(s.as_str()),
                Value::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }

    fn convert_row(row: &SqliteRow) -> Result<Row, DatabaseError> {
        let mut columns = Vec::with_capacity(row.columns().len());
        let mut values = Vec::with_capacity(row.columns().len());

        for (i, column) in row.columns().iter().enumerate() {
            // SQLite is dynamically typed; look at the stored value, not the declared type.
            let (is_null, type_name) = {
                let raw = row.try_get_raw(i)?;
                (raw.is_null(), raw.type_info().name().to_string())
            };
            let value = if is_null {
                Value::Null
            } else {
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get::<i64, _>(i)?),
                    "REAL" => Value::Real(row.try_get::<f64, _>(i)?),
                    "BLOB" => Value::Blob(row.try_get::<Vec<u8>, _>(i)?),
                    _ => Value::Text(row.try_get::<String, _>(i)?),
                }
            };
            columns.push(column.name().to_string());
            values.push(value);
        }

        Ok(Row::new(columns, values))
    }
}

#[async_trait]
impl Database for LocalDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Local
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DatabaseError> {
        debug!("execute (local): {}", sql);
        let result = Self::bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        debug!("query (local): {}", sql);
        let rows = Self::bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::convert_row).collect()
    }
}
