//! Remote procedure wire format shared by the server routes and the client.
//!
//! Mutations are `POST /trpc/{procedure}` with the JSON input as body, queries
//! are `GET /trpc/{procedure}`. Results come back as
//! `{"result":{"data":...}}`, failures as `{"error":{"message":...,"code":...}}`.

pub mod procedures;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::models::User;

pub const RPC_PREFIX: &str = "/trpc";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    InternalServerError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcData<T> {
    pub data: T,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcSuccess<T> {
    pub result: RpcData<T>,
}

impl<T> RpcSuccess<T> {
    pub fn new(data: T) -> Self {
        RpcSuccess {
            result: RpcData { data },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcErrorBody {
    pub message: String,
    pub code: ErrorCode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcFailure {
    pub error: RpcErrorBody,
}

/// Either shape a procedure response can take.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RpcEnvelope<T> {
    Success(RpcSuccess<T>),
    Failure(RpcFailure),
}

// --- Procedure inputs and outputs

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Output of `login` and `register`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AuthOutput {
    #[serde(default)]
    pub user: Option<User>,
}

/// Output of `logout`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogoutOutput {
    #[serde(default)]
    pub success: bool,
}
