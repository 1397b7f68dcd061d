use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{
    error::ServiceError,
    model::{LoadedModel, ModelMetadata, PredictionResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<LoadedModel>,
}

pub fn build_router(model: Arc<LoadedModel>) -> Router {
    let state = AppState { model };

    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(metadata))
        .route("/predict", post(predict))
        .route("/invocations", post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn metadata(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.model.metadata().clone())
}

// Single error boundary: whatever goes wrong while reading the body or
// predicting comes back as a 400.
async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    match run_prediction(&state, body).await {
        Ok(response) => {
            debug!(rows = response.predictions.len(), "prediction served");
            Ok(Json(response))
        }
        Err(err) => {
            debug!(error = %err, "prediction request rejected");
            Err(err)
        }
    }
}

async fn run_prediction(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<PredictionResponse, ServiceError> {
    let body = body.map_err(|rejection| ServiceError::Body(rejection.body_text()))?;
    let payload: serde_json::Value = serde_json::from_slice(&body)?;
    let predictions = state.model.predict(payload).await?;
    Ok(PredictionResponse { predictions })
}
