use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// A registered model addressed by name and alias, e.g. `models:/boston-housing@champion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReference {
    name: String,
    alias: String,
}

impl ModelReference {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Result<Self, ResolveError> {
        let name = name.into();
        let alias = alias.into();
        if name.trim().is_empty() {
            return Err(ResolveError::InvalidReference(
                "model name must not be empty".into(),
            ));
        }
        if alias.trim().is_empty() {
            return Err(ResolveError::InvalidReference(
                "model alias must not be empty".into(),
            ));
        }
        Ok(Self { name, alias })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "models:/{}@{}", self.name, self.alias)
    }
}

/// A model version record as the registry reports it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// What the process actually loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub alias: String,
    pub version: String,
    pub run_id: Option<String>,
    pub artifact_uri: String,
    pub flavor: String,
    pub feature_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub predictions: Vec<f64>,
}
