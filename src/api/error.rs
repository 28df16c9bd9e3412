use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::auth::{AuthzError, CredentialError, TokenError};

/// Message returned for every failed credential check. One shape for
/// unknown user, wrong password, disabled account, and dead token, so the
/// response never confirms which part was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Body shape shared by all error responses: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Bad username/password or unresolvable token; 401 with challenge.
    InvalidCredentials,

    /// Valid identity, insufficient privilege for the target; 403.
    Unauthorized(String),

    BadRequest(String),

    NotFound(String),

    MethodNotAllowed(String),

    Conflict(String),

    /// Repository failure. Detail is logged server-side only.
    Database(String),

    /// Hashing/randomness failure. Detail is logged server-side only.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidCredentials => write!(f, "{INVALID_CREDENTIALS}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::MethodNotAllowed(verb) => write!(f, "Method not allowed: {verb}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Database(msg) => write!(f, "Database error: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::MethodNotAllowed(verb) => (
                StatusCode::METHOD_NOT_ALLOWED,
                format!("{verb} is not a supported HTTP method for this resource"),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let challenge = matches!(self, ApiError::InvalidCredentials);

        let mut response = (
            status,
            Json(ErrorBody {
                error: error_message,
            }),
        )
            .into_response();

        if challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"liftlog\""),
            );
        }

        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InvalidToken => ApiError::InvalidCredentials,
            AuthzError::Forbidden => {
                ApiError::Unauthorized("not permitted for the requested owner".to_string())
            }
            AuthzError::Storage(e) => ApiError::Database(e.to_string()),
        }
    }
}
