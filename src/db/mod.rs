pub mod base;
pub mod local_database;
pub mod remote_database;
pub mod schema;
pub mod value;

// Re-export the primary items so code outside can do
// "use crate::db::{Database, create_database};"
pub use base::{create_database, Database, DatabaseError, DatabaseKind};
pub use schema::migrate;
pub use value::{Row, Value};
