// Re-exports so callers can "use crate::config::*".
pub mod config;
pub mod logging;
pub mod storage;

pub use config::*;
pub use logging::*;
pub use storage::*;
