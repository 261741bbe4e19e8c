//! Uniform response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Every response body, success or failure, has this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub flag: bool,
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            flag: true,
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            flag: false,
            code: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

impl ApiResult<()> {
    /// Success with `data: null`.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            flag: true,
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
