use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use claims_flow::FlowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Flow(e) => match e {
                FlowError::InvalidTransition { .. }
                | FlowError::SessionBusy(_)
                | FlowError::Cancelled => StatusCode::CONFLICT,
                FlowError::InvalidOption { .. } | FlowError::UploadRejected(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                FlowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                FlowError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                FlowError::UnknownFlow(_)
                | FlowError::TimelineInvariant(_)
                | FlowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Flow(e) => match e {
                FlowError::InvalidTransition { .. } => "invalid_transition",
                FlowError::InvalidOption { .. } => "invalid_option",
                FlowError::ProviderUnavailable(_) => "provider_unavailable",
                FlowError::UploadRejected(_) => "upload_rejected",
                FlowError::SessionBusy(_) => "session_busy",
                FlowError::SessionNotFound(_) => "not_found",
                FlowError::Cancelled => "cancelled",
                FlowError::UnknownFlow(_)
                | FlowError::TimelineInvariant(_)
                | FlowError::Storage(_) => "internal_error",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
