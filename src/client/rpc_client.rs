use http::StatusCode;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::rpc::{ErrorCode, RpcEnvelope, RPC_PREFIX};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("procedure failed ({code:?}): {message}")]
    Procedure { code: ErrorCode, message: String },
    #[error("unexpected response ({status}): {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Calls procedures on a server. The session cookie set by `login`/`register`
/// is kept in the client's cookie jar and sent on later calls.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    /// `base_url` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(RpcClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn procedure_url(&self, procedure: &str) -> String {
        format!("{}{}/{}", self.base_url, RPC_PREFIX, procedure)
    }

    pub async fn mutation<I, O>(&self, procedure: &str, input: &I) -> Result<O, ClientError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        debug!("mutation '{}'", procedure);
        let response = self
            .http
            .post(self.procedure_url(procedure))
            .json(input)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn query<O>(&self, procedure: &str) -> Result<O, ClientError>
    where
        O: DeserializeOwned,
    {
        debug!("query '{}'", procedure);
        let response = self.http.get(self.procedure_url(procedure)).send().await?;
        Self::decode(response).await
    }

    async fn decode<O: DeserializeOwned>(response: Response) -> Result<O, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<RpcEnvelope<O>>(&body) {
            Ok(RpcEnvelope::Success(success)) => Ok(success.result.data),
            Ok(RpcEnvelope::Failure(failure)) => Err(ClientError::Procedure {
                code: failure.error.code,
                message: failure.error.message,
            }),
            Err(_) if !status.is_success() => Err(ClientError::Status { status, body }),
            Err(e) => Err(ClientError::Decode(e.to_string())),
        }
    }
}
