//! Resolution step of the update check.
//!
//! Resolves the configured alias the same way the server does at startup and
//! reports what it points at. Deciding whether to roll the deployment forward
//! is left to whoever reads the report.

use tracing::info;

use crate::{
    error::ResolveError,
    model::{LoadedModel, ModelMetadata, ModelReference, ModelRegistry},
};

pub async fn resolve_latest(
    registry: &dyn ModelRegistry,
    reference: &ModelReference,
    artifact_file: &str,
) -> Result<ModelMetadata, ResolveError> {
    let latest = LoadedModel::resolve(registry, reference, artifact_file).await?;
    let metadata = latest.metadata().clone();
    info!(
        model = %reference,
        version = %metadata.version,
        "alias currently points at this version"
    );
    Ok(metadata)
}
