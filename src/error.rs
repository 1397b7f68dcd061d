use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::model::{ArtifactError, FrameError};

/// Failures raised while answering a prediction request.
///
/// Every variant is reported the same way: HTTP 400 with `{"error": message}`.
/// Client mistakes and predictor failures are deliberately not told apart.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("prediction failed: {0}")]
    Inference(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
    }
}

/// Failures while resolving a model reference into a loaded predictor.
/// Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid model reference: {0}")]
    InvalidReference(String),
    #[error("unsupported tracking uri '{0}': only http(s) registries are supported")]
    UnsupportedTrackingUri(String),
    #[error("registry unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("registry returned {status} ({code}): {message}")]
    Registry {
        status: u16,
        code: String,
        message: String,
    },
    #[error("malformed registry response: {0}")]
    MalformedResponse(String),
    #[error("unsupported artifact location '{0}'")]
    UnsupportedArtifactUri(String),
    #[error("model artifact unavailable at {location}: {reason}")]
    ArtifactUnavailable { location: String, reason: String },
    #[error("incompatible artifact format: {0}")]
    IncompatibleArtifact(#[from] ArtifactError),
}
