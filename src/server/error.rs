use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Errors returned by the feed routes.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed query parameters
    BadParams,
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        ApiError::Pipeline(error)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadParams => {
                json_error(StatusCode::BAD_REQUEST, "Failed to parse params".to_string())
            }
            ApiError::Pipeline(PipelineError::Fetch { url, .. }) => json_error(
                StatusCode::BAD_REQUEST,
                format!("Failed to fetch RSS feed {}", url),
            ),
            ApiError::Pipeline(PipelineError::Parse { url, .. }) => json_error(
                StatusCode::BAD_REQUEST,
                format!("Failed to parse RSS feed {}", url),
            ),
            ApiError::Pipeline(PipelineError::Unsupported { url, .. }) => json_error(
                StatusCode::BAD_REQUEST,
                format!("Unsupported RSS feed {}", url),
            ),
            ApiError::Pipeline(PipelineError::Unknown(error)) => {
                tracing::error!(error = ?error, "Internal error while serving feed");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}
