#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use registry_model_service::{
    LoadedModel, MlflowRegistry, ModelReference, config::RegistryConfig,
};

pub const MODEL_NAME: &str = "boston-housing";
pub const RUN_ID: &str = "run42";
pub const BOSTON_ARTIFACT: &[u8] = include_bytes!("../fixtures/boston_linear.json");

/// Serves the subset of the MLflow REST API the resolver talks to.
///
/// Aliases:
/// - `champion` -> version 3, proxied artifact store
/// - `challenger` -> version 4, `runs:/` download uri
/// - `local` -> version 5, artifact directory on disk
/// - `broken` -> version 6, artifact that is not a model document
#[derive(Clone)]
pub struct FakeMlflow {
    pub local_dir: PathBuf,
    pub required_token: Option<String>,
}

pub struct RunningRegistry {
    pub addr: SocketAddr,
    pub local_dir: PathBuf,
    // Removed from disk when the registry is dropped.
    _artifacts: TempDir,
}

impl RunningRegistry {
    pub fn tracking_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> RegistryConfig {
        registry_config(&self.tracking_uri())
    }

    pub fn client(&self) -> MlflowRegistry {
        MlflowRegistry::new(&self.config()).expect("valid tracking uri")
    }
}

pub fn registry_config(tracking_uri: &str) -> RegistryConfig {
    RegistryConfig {
        tracking_uri: tracking_uri.to_string(),
        token: None,
        username: None,
        password: None,
        request_timeout: Duration::from_secs(5),
    }
}

pub async fn spawn_registry() -> RunningRegistry {
    spawn_registry_with_token(None).await
}

pub async fn spawn_registry_with_token(required_token: Option<&str>) -> RunningRegistry {
    let artifacts = TempDir::new().unwrap();
    let local_dir = artifacts.path().to_path_buf();
    tokio::fs::write(local_dir.join("model.json"), BOSTON_ARTIFACT)
        .await
        .unwrap();

    let state = FakeMlflow {
        local_dir: local_dir.clone(),
        required_token: required_token.map(str::to_string),
    };
    let router = Router::new()
        .route("/api/2.0/mlflow/registered-models/alias", get(alias))
        .route(
            "/api/2.0/mlflow/model-versions/get-download-uri",
            get(download_uri),
        )
        .route("/api/2.0/mlflow/runs/get", get(run))
        .route("/api/2.0/mlflow-artifacts/artifacts/*path", get(artifact))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    RunningRegistry {
        addr,
        local_dir,
        _artifacts: artifacts,
    }
}

pub async fn resolve(registry: &RunningRegistry, alias: &str) -> LoadedModel {
    let reference = ModelReference::new(MODEL_NAME, alias).unwrap();
    LoadedModel::resolve(&registry.client(), &reference, "model.json")
        .await
        .unwrap_or_else(|err| panic!("resolving {reference} failed: {err}"))
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error_code": "RESOURCE_DOES_NOT_EXIST", "message": message})),
    )
        .into_response()
}

fn unauthorized(state: &FakeMlflow, headers: &HeaderMap) -> Option<Response> {
    let token = state.required_token.as_ref()?;
    let expected = format!("Bearer {token}");
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    if presented == Some(expected.as_str()) {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error_code": "UNAUTHENTICATED", "message": "missing token"})),
            )
                .into_response(),
        )
    }
}

async fn alias(
    State(state): State<FakeMlflow>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(denied) = unauthorized(&state, &headers) {
        return denied;
    }
    let name = params.get("name").cloned().unwrap_or_default();
    let alias = params.get("alias").cloned().unwrap_or_default();
    let version = match (name.as_str(), alias.as_str()) {
        (MODEL_NAME, "champion") => "3",
        (MODEL_NAME, "challenger") => "4",
        (MODEL_NAME, "local") => "5",
        (MODEL_NAME, "broken") => "6",
        _ => {
            return not_found(format!(
                "Registered model alias {alias} not found on model {name}."
            ));
        }
    };
    Json(json!({
        "model_version": {
            "name": name,
            "version": version,
            "source": format!("mlflow-artifacts:/1/{RUN_ID}/artifacts/model"),
            "run_id": RUN_ID,
            "status": "READY",
            "aliases": [alias]
        }
    }))
    .into_response()
}

async fn download_uri(
    State(state): State<FakeMlflow>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let uri = match params.get("version").map(String::as_str) {
        Some("3") => format!("mlflow-artifacts:/1/{RUN_ID}/artifacts/model"),
        Some("4") => format!("runs:/{RUN_ID}/model"),
        Some("5") => format!("file://{}", state.local_dir.display()),
        Some("6") => format!("mlflow-artifacts:/1/{RUN_ID}/artifacts/broken"),
        other => return not_found(format!("model version {other:?} not found")),
    };
    Json(json!({"artifact_uri": uri})).into_response()
}

async fn run(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("run_id").map(String::as_str) {
        Some(RUN_ID) => Json(json!({
            "run": {"info": {"run_id": RUN_ID, "artifact_uri": format!("mlflow-artifacts:/1/{RUN_ID}/artifacts")}}
        }))
        .into_response(),
        other => not_found(format!("run {other:?} not found")),
    }
}

async fn artifact(Path(path): Path<String>) -> Response {
    let model_path = format!("1/{RUN_ID}/artifacts/model/model.json");
    let broken_path = format!("1/{RUN_ID}/artifacts/broken/model.json");
    if path == model_path {
        BOSTON_ARTIFACT.into_response()
    } else if path == broken_path {
        b"{\"flavor\": \"pyfunc\", \"loader_module\": \"mlflow.sklearn\"}"
            .as_slice()
            .into_response()
    } else {
        not_found(format!("artifact {path} not found"))
    }
}
