use std::sync::Arc;

use tokio::net::TcpListener;

use registry_model_service::{
    AppConfig, LoadedModel, MlflowRegistry, build_router, telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let registry = MlflowRegistry::new(&config.registry)?;
    tracing::info!(
        model = %config.model,
        tracking_uri = %registry.tracking_uri(),
        "resolving model"
    );

    let model = Arc::new(
        LoadedModel::resolve(&registry, &config.model, &config.artifact_file).await?,
    );
    let router = build_router(model);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}
