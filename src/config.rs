use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Context, bail};

use crate::model::ModelReference;

pub const DEFAULT_MODEL_ALIAS: &str = "champion";
pub const DEFAULT_ARTIFACT_FILE: &str = "model.json";
const DEFAULT_LISTEN_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model: ModelReference,
    pub artifact_file: String,
    pub registry: RegistryConfig,
}

/// Connection settings for the tracking server that hosts the model registry.
#[derive(Clone)]
pub struct RegistryConfig {
    pub tracking_uri: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout: Duration,
}

// Credentials stay out of logs.
impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("tracking_uri", &self.tracking_uri)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = match lookup("SERVER_ADDR") {
            Some(raw) => raw
                .trim()
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid SERVER_ADDR: {raw}"))?,
            None => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_LISTEN_PORT),
        };

        let name = lookup("MODEL_NAME").context("MODEL_NAME must be set")?;
        let alias = lookup("MODEL_ALIAS").unwrap_or_else(|| DEFAULT_MODEL_ALIAS.to_string());
        let model = ModelReference::new(name, alias)?;

        let artifact_file =
            lookup("MODEL_ARTIFACT_FILE").unwrap_or_else(|| DEFAULT_ARTIFACT_FILE.to_string());

        let registry = RegistryConfig::from_lookup(&lookup)?;

        Ok(Self {
            listen_addr,
            model,
            artifact_file,
            registry,
        })
    }
}

impl RegistryConfig {
    pub fn from_lookup<F>(lookup: &F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tracking_uri = lookup("MLFLOW_TRACKING_URI")
            .filter(|v| !v.trim().is_empty())
            .context("MLFLOW_TRACKING_URI must be set")?;

        let request_timeout = match lookup("MLFLOW_HTTP_REQUEST_TIMEOUT") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid MLFLOW_HTTP_REQUEST_TIMEOUT: {raw}"))?;
                if secs == 0 {
                    bail!("MLFLOW_HTTP_REQUEST_TIMEOUT must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            tracking_uri,
            token: lookup("MLFLOW_TRACKING_TOKEN"),
            username: lookup("MLFLOW_TRACKING_USERNAME"),
            password: lookup("MLFLOW_TRACKING_PASSWORD"),
            request_timeout,
        })
    }
}
