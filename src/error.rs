use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error returned by a handler or extractor, rendered as `{error, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}: {message}")]
    BadRequest { error: &'static str, message: String },

    #[error("{error}: {message}")]
    Unauthorized { error: &'static str, message: String },

    #[error("{error}: {message}")]
    Conflict { error: &'static str, message: String },

    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    #[error("daily limit reached ({used_today}/{daily_limit})")]
    QuotaExceeded { used_today: i64, daily_limit: u32 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            error,
            message: message.into(),
        }
    }

    pub fn unauthorized(error: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            error,
            message: message.into(),
        }
    }

    pub fn conflict(error: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            error,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Request must be JSON", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest { error, message } => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": error, "message": message })))
                    .into_response()
            }
            ApiError::Unauthorized { error, message } => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": error, "message": message })))
                    .into_response()
            }
            ApiError::Conflict { error, message } => {
                (StatusCode::CONFLICT, Json(json!({ "error": error, "message": message })))
                    .into_response()
            }
            ApiError::Unavailable(feature) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service unavailable",
                    "message": format!("{feature} is not configured on this server"),
                })),
            )
                .into_response(),
            ApiError::QuotaExceeded {
                used_today,
                daily_limit,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Daily limit reached",
                    "message": format!(
                        "You have used all {daily_limit} meal calculations for today. Please try again tomorrow."
                    ),
                    "daily_limit": daily_limit,
                    "used_today": used_today,
                })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "message": "An unexpected error occurred while processing your request",
                    })),
                )
                    .into_response()
            }
        }
    }
}
