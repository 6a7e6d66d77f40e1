use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::pastes::PasteError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
    pub const EXPIRED: &str = "expired";
    pub const INVALID_EDIT_TOKEN: &str = "invalid_edit_token";
    pub const CLASSIFIER_UNAVAILABLE: &str = "classifier_unavailable";
    pub const SLUG_SERVICE_UNAVAILABLE: &str = "slug_service_unavailable";
    pub const INTERNAL: &str = "internal_error";
    pub const DB_UNAVAILABLE: &str = "db_unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn db_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_UNAVAILABLE,
            "database is unreachable",
        )
    }
}

impl From<PasteError> for ApiError {
    fn from(err: PasteError) -> Self {
        match err {
            PasteError::InvalidInput { message } => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message)
            }
            PasteError::NotFound => Self::not_found("paste not found"),
            PasteError::Expired => Self::new(StatusCode::GONE, codes::EXPIRED, "paste has expired"),
            PasteError::InvalidEditToken => Self::new(
                StatusCode::FORBIDDEN,
                codes::INVALID_EDIT_TOKEN,
                "invalid edit token",
            ),
            PasteError::ClassifierUnavailable(message) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::CLASSIFIER_UNAVAILABLE,
                message,
            ),
            PasteError::SlugServiceUnavailable(message) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::SLUG_SERVICE_UNAVAILABLE,
                message,
            ),
            PasteError::Internal(message) => {
                tracing::error!(%message, "internal error on http surface");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL,
                    "internal error",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
