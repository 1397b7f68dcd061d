use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    config::RegistryConfig,
    error::ResolveError,
    model::{ModelReference, ModelVersion},
};

/// The remote store that maps `(name, alias)` to a versioned artifact.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn model_version_by_alias(
        &self,
        reference: &ModelReference,
    ) -> Result<ModelVersion, ResolveError>;

    /// Location of the artifact directory for a model version.
    async fn download_uri(&self, version: &ModelVersion) -> Result<String, ResolveError>;

    async fn fetch_artifact(&self, artifact_uri: &str, file: &str)
    -> Result<Vec<u8>, ResolveError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    /// Served through the tracking server's artifact proxy.
    Proxied(String),
    /// Relative to a run's artifact root.
    Run { run_id: String, path: String },
    Local(PathBuf),
}

impl ArtifactLocation {
    pub fn parse(uri: &str) -> Result<Self, ResolveError> {
        let unsupported = || ResolveError::UnsupportedArtifactUri(uri.to_string());

        if let Some(rest) = uri.strip_prefix("mlflow-artifacts:") {
            // mlflow-artifacts://host:port/path carries an authority we ignore.
            let path = match rest.strip_prefix("//") {
                Some(with_host) => with_host.split_once('/').map(|(_, p)| p).unwrap_or(""),
                None => rest,
            };
            return Ok(Self::Proxied(path.trim_matches('/').to_string()));
        }

        if let Some(rest) = uri.strip_prefix("runs:") {
            let rest = rest.trim_start_matches('/');
            let (run_id, path) = rest.split_once('/').unwrap_or((rest, ""));
            if run_id.is_empty() {
                return Err(unsupported());
            }
            return Ok(Self::Run {
                run_id: run_id.to_string(),
                path: path.trim_matches('/').to_string(),
            });
        }

        if uri.starts_with("file:") {
            let path = Url::parse(uri)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(unsupported)?;
            return Ok(Self::Local(path));
        }

        if uri.starts_with('/') {
            return Ok(Self::Local(PathBuf::from(uri)));
        }

        Err(unsupported())
    }
}

#[derive(Clone)]
enum Credentials {
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Credentials::Basic { username, .. } => write!(f, "Basic({username}, <redacted>)"),
        }
    }
}

/// REST client for an MLflow-compatible tracking server.
#[derive(Debug, Clone)]
pub struct MlflowRegistry {
    base: Url,
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

#[derive(Deserialize)]
struct AliasResponse {
    model_version: ModelVersion,
}

#[derive(Deserialize)]
struct DownloadUriResponse {
    artifact_uri: String,
}

#[derive(Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    artifact_uri: String,
}

#[derive(Deserialize)]
struct RegistryErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl MlflowRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, ResolveError> {
        let raw = config.tracking_uri.trim();
        let base = Url::parse(raw)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ResolveError::UnsupportedTrackingUri(raw.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let credentials = match (&config.token, &config.username) {
            (Some(token), _) => Some(Credentials::Bearer(token.clone())),
            (None, Some(username)) => Some(Credentials::Basic {
                username: username.clone(),
                password: config.password.clone(),
            }),
            (None, None) => None,
        };

        Ok(Self {
            base,
            client,
            credentials,
        })
    }

    pub fn tracking_uri(&self) -> &Url {
        &self.base
    }

    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, ResolveError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ResolveError::UnsupportedTrackingUri(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ResolveError> {
        debug!(%url, "registry request");
        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(registry_error(status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ResolveError::MalformedResponse(e.to_string()))
    }

    async fn run_artifact_root(&self, run_id: &str) -> Result<String, ResolveError> {
        let mut url = self.endpoint(["api", "2.0", "mlflow", "runs", "get"])?;
        url.query_pairs_mut().append_pair("run_id", run_id);
        let response: RunResponse = self.get_json(url).await?;
        Ok(response.run.info.artifact_uri)
    }

    async fn read_location(
        &self,
        location: ArtifactLocation,
        file: &str,
    ) -> Result<Vec<u8>, ResolveError> {
        match location {
            ArtifactLocation::Proxied(path) => {
                let url = self.endpoint(
                    ["api", "2.0", "mlflow-artifacts", "artifacts"]
                        .into_iter()
                        .chain(path.split('/'))
                        .chain(file.split('/')),
                )?;
                debug!(%url, "downloading proxied artifact");
                let response = self.authorize(self.client.get(url.clone())).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ResolveError::ArtifactUnavailable {
                        location: url.to_string(),
                        reason: format!("registry answered {status}"),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
            ArtifactLocation::Local(dir) => {
                let path = dir.join(file);
                debug!(path = %path.display(), "reading local artifact");
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| ResolveError::ArtifactUnavailable {
                        location: path.display().to_string(),
                        reason: e.to_string(),
                    })
            }
            ArtifactLocation::Run { run_id, .. } => Err(ResolveError::UnsupportedArtifactUri(
                format!("runs:/{run_id} resolved to another runs:/ location"),
            )),
        }
    }
}

#[async_trait]
impl ModelRegistry for MlflowRegistry {
    async fn model_version_by_alias(
        &self,
        reference: &ModelReference,
    ) -> Result<ModelVersion, ResolveError> {
        let mut url = self.endpoint(["api", "2.0", "mlflow", "registered-models", "alias"])?;
        url.query_pairs_mut()
            .append_pair("name", reference.name())
            .append_pair("alias", reference.alias());
        let response: AliasResponse = self.get_json(url).await?;
        Ok(response.model_version)
    }

    async fn download_uri(&self, version: &ModelVersion) -> Result<String, ResolveError> {
        let mut url = self.endpoint([
            "api",
            "2.0",
            "mlflow",
            "model-versions",
            "get-download-uri",
        ])?;
        url.query_pairs_mut()
            .append_pair("name", &version.name)
            .append_pair("version", &version.version);
        let response: DownloadUriResponse = self.get_json(url).await?;
        if response.artifact_uri.trim().is_empty() {
            return Err(ResolveError::MalformedResponse(
                "empty artifact_uri in download-uri response".into(),
            ));
        }
        Ok(response.artifact_uri)
    }

    async fn fetch_artifact(
        &self,
        artifact_uri: &str,
        file: &str,
    ) -> Result<Vec<u8>, ResolveError> {
        let location = match ArtifactLocation::parse(artifact_uri)? {
            ArtifactLocation::Run { run_id, path } => {
                let root = self.run_artifact_root(&run_id).await?;
                let joined = if path.is_empty() {
                    root
                } else {
                    format!("{}/{}", root.trim_end_matches('/'), path)
                };
                ArtifactLocation::parse(&joined)?
            }
            other => other,
        };
        self.read_location(location, file).await
    }
}

fn registry_error(status: StatusCode, body: &str) -> ResolveError {
    let parsed = serde_json::from_str::<RegistryErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.error_code.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("UNKNOWN").to_string());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());
    ResolveError::Registry {
        status: status.as_u16(),
        code,
        message,
    }
}
