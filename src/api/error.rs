// API Errors
// Maps request failures to the service's fixed JSON error bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorBody;
use crate::services::BatchError;

pub const MODEL_NOT_LOADED_MESSAGE: &str = "Model is not loaded.";
pub const INVALID_REVIEWS_MESSAGE: &str = "Request body must contain a \"reviews\" array.";
pub const INTERNAL_MESSAGE: &str = "Could not process the request.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("model is not loaded")]
    ModelNotLoaded,
    #[error("request has no usable reviews array")]
    InvalidRequest,
    /// Detail is logged, never returned to the caller
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::ModelNotLoaded => MODEL_NOT_LOADED_MESSAGE,
            ApiError::InvalidRequest => INVALID_REVIEWS_MESSAGE,
            ApiError::Internal(_) => INTERNAL_MESSAGE,
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::EmptyBatch => ApiError::InvalidRequest,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("malformed request body: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref detail) = self {
            error!("[API] request failed: {}", detail);
        }

        let body = ErrorBody {
            error: self.public_message().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
