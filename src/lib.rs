pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod smoke;
pub mod telemetry;
pub mod update;

pub use config::AppConfig;
pub use error::{ResolveError, ServiceError};
pub use model::{LoadedModel, MlflowRegistry, ModelReference, ModelRegistry, PredictionResponse};
pub use server::build_router;
