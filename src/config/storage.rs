use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Connection settings for the application database.
///
/// A `file:` URL selects the local SQLite driver; anything else is treated as a
/// remote libSQL server.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct DatabaseConfig {
    pub url: String,
    /// Not needed for local files.
    pub auth_token: Option<String>,
}

/// Object-storage bucket settings (S3 or an S3-compatible service such as B2 or MinIO).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct S3Config {
    /// `accessKeyId` in S3, application key id in B2.
    pub access_key_id: Option<String>,
    /// `secretAccessKey` in S3, application key in B2.
    pub secret_access_key: Option<String>,
    pub bucket_name: String,
    pub region: String,
    /// Must start with http:// or https://
    pub endpoint: String,
}

impl S3Config {
    pub const DEFAULT_BUCKET_NAME: &'static str = "solid-launch";
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    pub const DEFAULT_ENDPOINT: &'static str = "http://127.0.0.1:9000";

    /// True when both halves of the credential pair are present.
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        S3Config {
            access_key_id: None,
            secret_access_key: None,
            bucket_name: Self::DEFAULT_BUCKET_NAME.to_string(),
            region: Self::DEFAULT_REGION.to_string(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }
}
