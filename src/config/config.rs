use std::collections::BTreeMap;
use std::fmt;

use figment::providers::{Env, Serialized};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LoggingConfig;
use super::storage::{DatabaseConfig, S3Config};

/// Environment variables read at startup. Anything else in the process
/// environment is ignored.
pub const ENV_VARS: [&str; 11] = [
    "PORT",
    "NODE_ENV",
    "DATABASE_URL",
    "DATABASE_AUTH_TOKEN",
    "S3_ACCESS_KEY_ID",
    "S3_SECRET_ACCESS_KEY",
    "S3_BUCKET_NAME",
    "S3_REGION",
    "S3_ENDPOINT",
    "LOG_LEVEL",
    "LOG_FORMAT",
];

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Development or Production.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Private, server-only configuration. Built once at boot and never mutated.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct AppConfig {
    /// Port of the app.
    pub port: u16,
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub s3: S3Config,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// The flat shape of the environment, keyed by lowercased variable name.
/// Every value is the variable's text as set; `PORT` is parsed afterwards.
#[derive(Deserialize, Serialize, Debug, Default, JsonSchema)]
pub struct EnvConfig {
    pub port: Option<String>,
    pub node_env: Option<String>,
    pub database_url: Option<String>,
    pub database_auth_token: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

// Empty variables count as unset.
fn text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<EnvConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(env: EnvConfig) -> Result<Self, Self::Error> {
        let port = match text(env.port) {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw.clone(),
                reason: "expected a port number between 0 and 65535",
            })?,
        };

        let environment = match text(env.node_env) {
            None => Environment::default(),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "development" => Environment::Development,
                "production" => Environment::Production,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "NODE_ENV",
                        value: raw,
                        reason: "expected 'development' or 'production'",
                    })
                }
            },
        };

        let database = DatabaseConfig {
            url: text(env.database_url).ok_or(ConfigError::Missing("DATABASE_URL"))?,
            auth_token: text(env.database_auth_token),
        };

        let defaults = S3Config::default();
        let s3 = S3Config {
            access_key_id: text(env.s3_access_key_id),
            secret_access_key: text(env.s3_secret_access_key),
            bucket_name: text(env.s3_bucket_name).unwrap_or(defaults.bucket_name),
            region: text(env.s3_region).unwrap_or(defaults.region),
            endpoint: text(env.s3_endpoint).unwrap_or(defaults.endpoint),
        };
        if !(s3.endpoint.starts_with("http://") || s3.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "S3_ENDPOINT",
                value: s3.endpoint,
                reason: "must start with http:// or https://",
            });
        }

        let fallback = LoggingConfig::default_for(environment);
        let logging = LoggingConfig {
            level: text(env.log_level).unwrap_or(fallback.level),
            format: text(env.log_format).unwrap_or(fallback.format),
        };
        if !LoggingConfig::is_valid_level(&logging.level) {
            return Err(ConfigError::Invalid {
                var: "LOG_LEVEL",
                value: logging.level,
                reason: "expected one of trace, debug, info, warn, error",
            });
        }

        Ok(AppConfig {
            port,
            environment,
            database,
            s3,
            logging,
        })
    }
}

/// The known variables from the process environment, unparsed. `Env` as a
/// provider would read `007` as the number 7.
pub fn raw_env() -> Figment {
    let vars: BTreeMap<String, String> = Env::raw()
        .only(&ENV_VARS)
        .iter()
        .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
        .collect();
    Figment::from(Serialized::defaults(vars))
}

/// Load config from the process environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(raw_env())
}

/// Load config from any figment whose keys are the lowercased variable names.
pub fn load_config_from(figment: Figment) -> Result<AppConfig, ConfigError> {
    let env = figment.extract::<EnvConfig>().map_err(Box::new)?;
    AppConfig::try_from(env)
}

/// Print the JSON schema of the environment shape to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(EnvConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
