use serde::Deserialize;
use thiserror::Error;

use crate::model::frame::{Frame, FrameError};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact is not a recognised model document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model declares no features")]
    NoFeatures,
    #[error("{features} feature names but {coefficients} coefficients")]
    LengthMismatch {
        features: usize,
        coefficients: usize,
    },
    #[error("duplicate feature name '{0}'")]
    DuplicateFeature(String),
    #[error("non-finite parameter in model: {0}")]
    NonFinite(String),
}

/// A loaded model: maps a batch of input records to one value per record.
pub trait Predictor: Send + Sync {
    fn flavor(&self) -> &'static str;

    fn feature_names(&self) -> &[String];

    fn predict(&self, frame: &Frame) -> Result<Vec<f64>, FrameError>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "flavor", rename_all = "lowercase")]
enum ModelDocument {
    Linear(LinearParams),
    Logistic(LinearParams),
}

#[derive(Debug, Clone, Deserialize)]
struct LinearParams {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    #[serde(default)]
    intercept: f64,
}

impl LinearParams {
    fn validate(self) -> Result<Self, ArtifactError> {
        if self.feature_names.is_empty() {
            return Err(ArtifactError::NoFeatures);
        }
        if self.feature_names.len() != self.coefficients.len() {
            return Err(ArtifactError::LengthMismatch {
                features: self.feature_names.len(),
                coefficients: self.coefficients.len(),
            });
        }
        for (idx, name) in self.feature_names.iter().enumerate() {
            if self.feature_names[..idx].contains(name) {
                return Err(ArtifactError::DuplicateFeature(name.clone()));
            }
        }
        if !self.intercept.is_finite() {
            return Err(ArtifactError::NonFinite("intercept".into()));
        }
        if let Some(pos) = self.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(ArtifactError::NonFinite(format!(
                "coefficient for '{}'",
                self.feature_names[pos]
            )));
        }
        Ok(self)
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Parses a model document into a ready predictor.
pub fn load_predictor(bytes: &[u8]) -> Result<Box<dyn Predictor>, ArtifactError> {
    let document: ModelDocument = serde_json::from_slice(bytes)?;
    let predictor: Box<dyn Predictor> = match document {
        ModelDocument::Linear(params) => Box::new(LinearRegression {
            params: params.validate()?,
        }),
        ModelDocument::Logistic(params) => Box::new(LogisticRegression {
            params: params.validate()?,
        }),
    };
    Ok(predictor)
}

#[derive(Debug)]
pub struct LinearRegression {
    params: LinearParams,
}

impl Predictor for LinearRegression {
    fn flavor(&self) -> &'static str {
        "linear"
    }

    fn feature_names(&self) -> &[String] {
        &self.params.feature_names
    }

    fn predict(&self, frame: &Frame) -> Result<Vec<f64>, FrameError> {
        let matrix = frame.to_matrix(&self.params.feature_names)?;
        finite(matrix.iter().map(|row| self.params.decision(row)))
    }
}

/// Binary classifier; predictions are probabilities of the positive class.
#[derive(Debug)]
pub struct LogisticRegression {
    params: LinearParams,
}

impl Predictor for LogisticRegression {
    fn flavor(&self) -> &'static str {
        "logistic"
    }

    fn feature_names(&self) -> &[String] {
        &self.params.feature_names
    }

    fn predict(&self, frame: &Frame) -> Result<Vec<f64>, FrameError> {
        let matrix = frame.to_matrix(&self.params.feature_names)?;
        finite(
            matrix
                .iter()
                .map(|row| sigmoid(self.params.decision(row))),
        )
    }
}

// Overflowing inputs yield inf or NaN, which JSON cannot carry.
fn finite(values: impl Iterator<Item = f64>) -> Result<Vec<f64>, FrameError> {
    values
        .enumerate()
        .map(|(row, value)| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(FrameError::NonFinitePrediction { row })
            }
        })
        .collect()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
