//! Infrastructure layer: storage, the remote orbit computation client,
//! configuration and the calculation use cases that tie them together.

pub mod calculation;
pub mod computation;
pub mod config;
pub mod repository;


pub use calculation::{CalculationError, CalculationService, CometCalculationService};
pub use computation::{ComputationError, HttpOrbitComputationClient, OrbitComputation};
pub use config::{AppConfig, ConfigError, StorageConfig};
pub use repository::{
    CometRepository, InMemoryCometRepository, PostgresCometRepository, RepositoryError,
    RepositoryResult,
};
