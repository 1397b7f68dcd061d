mod frame;
mod loader;
mod predictor;
mod registry;
mod types;

pub use frame::{Frame, FrameError};
pub use loader::LoadedModel;
pub use predictor::{ArtifactError, LinearRegression, LogisticRegression, Predictor, load_predictor};
pub use registry::{ArtifactLocation, MlflowRegistry, ModelRegistry};
pub use types::{ModelMetadata, ModelReference, ModelVersion, PredictionResponse};
