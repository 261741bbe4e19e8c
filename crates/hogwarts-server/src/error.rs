//! Error types for the Hogwarts server.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hogwarts_auth::AuthError;
use serde_json::Value;

use crate::id_worker::IdError;
use crate::response::ApiResult;
use crate::store::StoreError;

pub const MSG_INVALID_ARGUMENTS: &str = "Provided arguments are invalid, see data for details.";
pub const MSG_BAD_CREDENTIALS: &str = "username or password is incorrect.";
pub const MSG_ACCOUNT_DISABLED: &str = "User account is abnormal.";
pub const MSG_MISSING_CREDENTIALS: &str = "Login credentials are missing.";
pub const MSG_INVALID_TOKEN: &str =
    "The access token provided is expired, revoked, malformed, or invalid for other reasons.";
pub const MSG_NO_PERMISSION: &str = "No permission.";
pub const MSG_INTERNAL: &str = "A server internal occurs.";

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not find {entity} with Id {id} :(")]
    NotFound { entity: &'static str, id: String },

    /// Field name to message.
    #[error("Invalid arguments: {0:?}")]
    Validation(BTreeMap<String, String>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Bad credentials")]
    InvalidCredentials,

    #[error("User is disabled")]
    AccountDisabled,

    #[error("Full authentication is required to access this resource")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    IdGeneration(#[from] IdError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Conflict(_)) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::AccountDisabled
            | AppError::MissingCredentials
            | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Store(StoreError::Database(_))
            | AppError::IdGeneration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(reason) => AppError::InvalidToken(reason),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, data): (String, Option<Value>) = match self {
            AppError::NotFound { entity, id } => {
                (format!("Could not find {} with Id {} :(", entity, id), None)
            }
            AppError::Validation(fields) => (
                MSG_INVALID_ARGUMENTS.to_string(),
                serde_json::to_value(fields).ok(),
            ),
            AppError::BadRequest(msg) => (
                MSG_INVALID_ARGUMENTS.to_string(),
                Some(Value::String(msg)),
            ),
            AppError::Store(StoreError::Conflict(msg)) => (
                MSG_INVALID_ARGUMENTS.to_string(),
                Some(Value::String(msg)),
            ),
            e @ AppError::InvalidCredentials => (
                MSG_BAD_CREDENTIALS.to_string(),
                Some(Value::String(e.to_string())),
            ),
            e @ AppError::AccountDisabled => (
                MSG_ACCOUNT_DISABLED.to_string(),
                Some(Value::String(e.to_string())),
            ),
            e @ AppError::MissingCredentials => (
                MSG_MISSING_CREDENTIALS.to_string(),
                Some(Value::String(e.to_string())),
            ),
            AppError::InvalidToken(reason) => {
                (MSG_INVALID_TOKEN.to_string(), Some(Value::String(reason)))
            }
            AppError::AccessDenied(reason) => {
                (MSG_NO_PERMISSION.to_string(), Some(Value::String(reason)))
            }
            AppError::Store(StoreError::Database(e)) => {
                tracing::error!("Database error: {}", e);
                (MSG_INTERNAL.to_string(), None)
            }
            AppError::IdGeneration(e) => {
                tracing::error!("Id generation failed: {}", e);
                (MSG_INTERNAL.to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (MSG_INTERNAL.to_string(), None)
            }
        };

        ApiResult::failure(status, message, data).into_response()
    }
}
