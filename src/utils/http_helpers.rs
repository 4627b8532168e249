use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::rpc::{ErrorCode, RpcErrorBody, RpcFailure};
use crate::session::SessionError;

/// A procedure failure, rendered as the RPC error envelope with the matching
/// HTTP status.
#[derive(Debug)]
pub struct HTTPError {
    code: ErrorCode,
    message: String,
}

impl HTTPError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        HTTPError {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        let body = RpcFailure {
            error: RpcErrorBody {
                message: self.message,
                code: self.code,
            },
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<SessionError> for HTTPError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidInput(message) => HTTPError::new(ErrorCode::BadRequest, message),
            SessionError::UsernameTaken => HTTPError::new(ErrorCode::Conflict, e.to_string()),
            SessionError::InvalidCredentials => {
                HTTPError::new(ErrorCode::Unauthorized, "Incorrect username or password")
            }
            SessionError::Hash(_) | SessionError::Database(_) => {
                // Internal details stay in the log.
                error!("Procedure failed: {}", e);
                HTTPError::new(ErrorCode::InternalServerError, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for HTTPError {
    fn from(rejection: JsonRejection) -> Self {
        HTTPError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseError;
    use http::StatusCode;

    #[test]
    fn test_session_errors_map_to_codes() {
        let cases = [
            (SessionError::InvalidInput("bad".into()), ErrorCode::BadRequest),
            (SessionError::UsernameTaken, ErrorCode::Conflict),
            (SessionError::InvalidCredentials, ErrorCode::Unauthorized),
            (
                SessionError::Database(DatabaseError::Query("boom".into())),
                ErrorCode::InternalServerError,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(HTTPError::from(err).code(), code);
        }
    }

    #[test]
    fn test_response_status() {
        let response = HTTPError::new(ErrorCode::Conflict, "taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
