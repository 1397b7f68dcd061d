mod common;

use std::time::Duration;

use tokio::net::TcpListener;

use registry_model_service::{
    LoadedModel, MlflowRegistry, ModelReference, ResolveError, update::resolve_latest,
};

async fn try_resolve(registry: &MlflowRegistry, alias: &str) -> Result<LoadedModel, ResolveError> {
    let reference = ModelReference::new(common::MODEL_NAME, alias).unwrap();
    LoadedModel::resolve(registry, &reference, "model.json").await
}

#[tokio::test]
async fn champion_resolves_through_artifact_proxy() {
    let registry = common::spawn_registry().await;
    let model = common::resolve(&registry, "champion").await;

    let metadata = model.metadata();
    assert_eq!(metadata.version, "3");
    assert_eq!(metadata.run_id.as_deref(), Some(common::RUN_ID));
    assert_eq!(
        metadata.artifact_uri,
        format!("mlflow-artifacts:/1/{}/artifacts/model", common::RUN_ID)
    );
}

#[tokio::test]
async fn runs_uri_is_resolved_via_run_artifact_root() {
    let registry = common::spawn_registry().await;
    let model = common::resolve(&registry, "challenger").await;

    assert_eq!(model.metadata().version, "4");
    assert_eq!(
        model.metadata().artifact_uri,
        format!("runs:/{}/model", common::RUN_ID)
    );
    let predictions = model
        .predict(registry_model_service::smoke::boston_housing_payload())
        .await
        .unwrap();
    assert_eq!(predictions.len(), 1);
}

#[tokio::test]
async fn local_artifact_directory_is_read_from_disk() {
    let registry = common::spawn_registry().await;
    let model = common::resolve(&registry, "local").await;

    assert_eq!(model.metadata().version, "5");
    assert!(model.metadata().artifact_uri.starts_with("file://"));
    assert!(
        model
            .metadata()
            .artifact_uri
            .ends_with(&registry.local_dir.display().to_string())
    );
}

#[tokio::test]
async fn unknown_alias_is_a_registry_error() {
    let registry = common::spawn_registry().await;
    let err = try_resolve(&registry.client(), "nonexistent")
        .await
        .err()
        .expect("alias should not resolve");

    match err {
        ResolveError::Registry {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, "RESOURCE_DOES_NOT_EXIST");
            assert!(message.contains("nonexistent"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_model_artifact_is_incompatible() {
    let registry = common::spawn_registry().await;
    let err = try_resolve(&registry.client(), "broken")
        .await
        .err()
        .expect("artifact should be rejected");
    assert!(matches!(err, ResolveError::IncompatibleArtifact(_)));
}

#[tokio::test]
async fn missing_artifact_file_is_unavailable() {
    let registry = common::spawn_registry().await;
    let reference = ModelReference::new(common::MODEL_NAME, "champion").unwrap();
    let err = LoadedModel::resolve(&registry.client(), &reference, "weights.json")
        .await
        .err()
        .expect("artifact file does not exist");
    assert!(matches!(err, ResolveError::ArtifactUnavailable { .. }));
}

#[tokio::test]
async fn unreachable_registry_fails_resolution() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = common::registry_config(&format!("http://{addr}"));
    config.request_timeout = Duration::from_secs(2);
    let client = MlflowRegistry::new(&config).unwrap();

    let err = try_resolve(&client, "champion")
        .await
        .err()
        .expect("nothing is listening");
    assert!(matches!(err, ResolveError::Transport(_)));
}

#[tokio::test]
async fn bearer_token_is_sent_to_registry() {
    let registry = common::spawn_registry_with_token(Some("s3cret")).await;

    let anonymous = try_resolve(&registry.client(), "champion")
        .await
        .err()
        .expect("token is required");
    assert!(matches!(anonymous, ResolveError::Registry { status: 401, .. }));

    let mut config = registry.config();
    config.token = Some("s3cret".into());
    let authorized = MlflowRegistry::new(&config).unwrap();
    let model = try_resolve(&authorized, "champion").await.unwrap();
    assert_eq!(model.metadata().version, "3");
}

#[tokio::test]
async fn update_check_reports_current_alias_target() {
    let registry = common::spawn_registry().await;
    let reference = ModelReference::new(common::MODEL_NAME, "challenger").unwrap();

    let latest = resolve_latest(&registry.client(), &reference, "model.json")
        .await
        .unwrap();
    assert_eq!(latest.version, "4");
    assert_eq!(latest.alias, "challenger");

    let missing = ModelReference::new(common::MODEL_NAME, "retired").unwrap();
    assert!(
        resolve_latest(&registry.client(), &missing, "model.json")
            .await
            .is_err()
    );
}
