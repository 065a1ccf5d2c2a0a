use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::resp::ApiResponse;

/// Central error type for the marketplace API.
///
/// Authentication failures map to distinct token codes so clients can
/// re-login; aggregation and store failures collapse into a generic
/// internal error with the cause in logs only.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("token verification failed")]
    TokenVerify,

    #[error("token expired")]
    TokenExpired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Application-level status code carried in the response envelope.
    pub fn app_code(&self) -> i32 {
        match self {
            AppError::TokenVerify => 40001,
            AppError::TokenExpired => 40002,
            AppError::BadRequest(_) => 40000,
            AppError::NotFound(_) => 40400,
            AppError::Internal(_) => 50000,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            AppError::TokenVerify | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Internal causes are logged, never echoed to clients.
            AppError::Internal(cause) => {
                tracing::error!(error = %cause, "request failed");
                "unexpected error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ApiResponse::<()>::err(self.app_code(), message));
        (self.http_status(), body).into_response()
    }
}
