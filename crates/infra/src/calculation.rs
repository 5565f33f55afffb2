//! Comet calculation use cases (application-level orchestration).
//!
//! ## Creation Flow
//!
//! ```text
//! CometSubmission
//!   ↓
//! 1. Validate observation count (no IO, no ids yet)
//!   ↓
//! 2. Assemble skeleton (comet id, observation ids, back-references)
//!   ↓
//! 3. Remote orbit computation (single attempt, bounded by client timeout)
//!   ↓
//! 4. Attach characteristic keyed by the comet id
//!   ↓
//! 5. Persist the whole aggregate
//! ```
//!
//! The first failing step ends the request. Nothing is written before step 5,
//! so a failed validation or computation leaves storage untouched.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use astro_core::{
    Comet, CometId, CometSkeleton, CometSubmission, DomainError, validate_name,
    validate_observations,
};

use crate::computation::{ComputationError, OrbitComputation};
use crate::repository::{CometRepository, RepositoryError};

/// Use-case level error, one variant per failure class the HTTP layer maps.
#[derive(Debug, Clone, Error)]
pub enum CalculationError {
    /// Caller input rejected; the message is meant for the caller.
    #[error("{0}")]
    Validation(String),

    #[error("failed to encode observations: {0}")]
    Serialization(String),

    #[error("orbit computation service unavailable: {0}")]
    ComputationUnavailable(String),

    /// `body` is the (truncated) response body of the computation service.
    #[error("orbit computation failed with status {status}: {body}")]
    ComputationFailed { status: u16, body: String },

    #[error("failed to decode orbit computation response: {0}")]
    Decoding(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("comet {0} not found")]
    NotFound(CometId),
}

impl From<DomainError> for CalculationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::InvariantViolation(msg) => Self::Persistence(msg),
        }
    }
}

impl From<ComputationError> for CalculationError {
    fn from(value: ComputationError) -> Self {
        match value {
            ComputationError::Serialization(msg) => Self::Serialization(msg),
            ComputationError::Unavailable(msg) => Self::ComputationUnavailable(msg),
            ComputationError::Failed { status, body } => Self::ComputationFailed { status, body },
            ComputationError::Decoding(msg) => Self::Decoding(msg),
        }
    }
}

impl From<RepositoryError> for CalculationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::Invariant(msg) | RepositoryError::Storage(msg) => {
                Self::Persistence(msg)
            }
        }
    }
}

/// Use cases exposed to the HTTP boundary.
#[async_trait]
pub trait CalculationService: Send + Sync {
    /// Validate, compute, assemble and persist a new comet aggregate.
    async fn create_comet_calculation(
        &self,
        submission: CometSubmission,
    ) -> Result<Comet, CalculationError>;

    async fn get_all_comets_calculation(&self) -> Result<Vec<Comet>, CalculationError>;

    async fn get_comet_calculation(&self, id: CometId) -> Result<Comet, CalculationError>;

    async fn delete_comet_observation(&self, id: CometId) -> Result<(), CalculationError>;
}

/// Default [`CalculationService`] composing a repository and a computation client.
///
/// ## Generic Parameters
///
/// - `R`: comet repository (`PostgresCometRepository`, `InMemoryCometRepository`, ...)
/// - `C`: orbit computation client (`HttpOrbitComputationClient` or a test double)
pub struct CometCalculationService<R, C> {
    repository: R,
    computation: C,
}

impl<R, C> CometCalculationService<R, C> {
    pub fn new(repository: R, computation: C) -> Self {
        Self {
            repository,
            computation,
        }
    }
}

#[async_trait]
impl<R, C> CalculationService for CometCalculationService<R, C>
where
    R: CometRepository,
    C: OrbitComputation,
{
    #[instrument(
        skip(self, submission),
        fields(observation_count = submission.observations.len()),
        err
    )]
    async fn create_comet_calculation(
        &self,
        submission: CometSubmission,
    ) -> Result<Comet, CalculationError> {
        let batch = validate_observations(submission.observations)?;
        let name = validate_name(submission.name)?;

        let skeleton = CometSkeleton::assemble(batch, name);
        let comet_id = skeleton.id();

        let elements = match self.computation.compute(skeleton.observations()).await {
            Ok(elements) => elements,
            Err(err) => {
                match &err {
                    ComputationError::Failed { status, body } => warn!(
                        %comet_id,
                        status,
                        body = %body,
                        "orbit computation rejected the batch; nothing persisted"
                    ),
                    _ => warn!(%comet_id, error = %err, "orbit computation failed; nothing persisted"),
                }
                return Err(err.into());
            }
        };

        let comet = skeleton.attach(elements);
        self.repository.create(&comet).await?;

        info!(
            %comet_id,
            observations = comet.observations().len(),
            "comet calculation persisted"
        );
        Ok(comet)
    }

    async fn get_all_comets_calculation(&self) -> Result<Vec<Comet>, CalculationError> {
        Ok(self.repository.get_all().await?)
    }

    async fn get_comet_calculation(&self, id: CometId) -> Result<Comet, CalculationError> {
        Ok(self.repository.get_by_id(id).await?)
    }

    #[instrument(skip(self), fields(comet_id = %id), err)]
    async fn delete_comet_observation(&self, id: CometId) -> Result<(), CalculationError> {
        self.repository.delete(id).await?;
        info!(comet_id = %id, "comet calculation deleted");
        Ok(())
    }
}
