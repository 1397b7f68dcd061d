use anyhow::Context;

use registry_model_service::{
    AppConfig, MlflowRegistry, telemetry::init_tracing, update::resolve_latest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let registry = MlflowRegistry::new(&config.registry)?;

    let latest = resolve_latest(&registry, &config.model, &config.artifact_file)
        .await
        .with_context(|| format!("failed to resolve {}", config.model))?;

    println!("{}", serde_json::to_string_pretty(&latest)?);
    Ok(())
}
