use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Environment;

/// Log levels accepted in `LOG_LEVEL`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// LoggingConfig controls how we initialize tracing/logging.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct LoggingConfig {
    pub level: String,  // e.g. "info", "debug", "warn"
    pub format: String, // "json" or "console"
}

impl LoggingConfig {
    /// Development gets verbose, human-readable output; production gets JSON.
    pub fn default_for(environment: Environment) -> Self {
        match environment {
            Environment::Development => LoggingConfig {
                level: "debug".to_string(),
                format: "console".to_string(),
            },
            Environment::Production => LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }

    pub fn is_valid_level(level: &str) -> bool {
        LOG_LEVELS.contains(&level.trim().to_lowercase().as_str())
    }
}
