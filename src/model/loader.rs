use std::sync::Arc;

use serde_json::Value;
use tokio::task;
use tracing::info;

use crate::{
    error::{ResolveError, ServiceError},
    model::{
        ModelMetadata, ModelReference,
        frame::Frame,
        predictor::{Predictor, load_predictor},
        registry::ModelRegistry,
    },
};

/// The predictor a process serves for its whole lifetime, plus what was resolved to get it.
pub struct LoadedModel {
    metadata: ModelMetadata,
    predictor: Arc<dyn Predictor>,
}

impl LoadedModel {
    /// Resolves `reference` through `registry` and loads the artifact it points at.
    ///
    /// No retry and no fallback alias: any failure is returned as is.
    pub async fn resolve(
        registry: &dyn ModelRegistry,
        reference: &ModelReference,
        artifact_file: &str,
    ) -> Result<Self, ResolveError> {
        let version = registry.model_version_by_alias(reference).await?;
        info!(
            model = %reference,
            version = %version.version,
            status = version.status.as_deref().unwrap_or("unknown"),
            "resolved model alias"
        );

        let artifact_uri = registry.download_uri(&version).await?;
        let bytes = registry.fetch_artifact(&artifact_uri, artifact_file).await?;
        let predictor: Arc<dyn Predictor> = Arc::from(load_predictor(&bytes)?);

        let metadata = ModelMetadata {
            name: version.name,
            alias: reference.alias().to_string(),
            version: version.version,
            run_id: version.run_id,
            artifact_uri,
            flavor: predictor.flavor().to_string(),
            feature_names: predictor.feature_names().to_vec(),
        };
        info!(
            flavor = %metadata.flavor,
            features = metadata.feature_names.len(),
            artifact_uri = %metadata.artifact_uri,
            "model artifact loaded"
        );

        Ok(Self {
            metadata,
            predictor,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Runs the predictor over a raw JSON payload on the blocking pool.
    pub async fn predict(&self, payload: Value) -> Result<Vec<f64>, ServiceError> {
        let predictor = self.predictor.clone();
        task::spawn_blocking(move || -> Result<Vec<f64>, ServiceError> {
            let frame = Frame::from_json(payload)?;
            Ok(predictor.predict(&frame)?)
        })
        .await
        .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?
    }
}
