//! Orbit determination is owned by a remote computation service.
//!
//! This module only defines the boundary: send a batch of observations, get
//! back [`OrbitalElements`] without an identifier. Keying the elements to a
//! comet is the assembler's job, not the client's.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use astro_core::{Observation, OrbitalElements};

pub mod http;

pub use http::HttpOrbitComputationClient;

/// Failure talking to the computation service. None of these are retried.
#[derive(Debug, Clone, Error)]
pub enum ComputationError {
    /// The outbound payload could not be encoded.
    #[error("failed to encode observations: {0}")]
    Serialization(String),

    /// Connection refused, DNS failure, timeout, broken body stream.
    #[error("orbit computation service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("orbit computation failed with status {status}")]
    Failed { status: u16, body: String },

    /// The success body did not match the expected element set.
    #[error("failed to decode orbit computation response: {0}")]
    Decoding(String),
}

/// Remote orbit determination.
#[async_trait]
pub trait OrbitComputation: Send + Sync {
    async fn compute(
        &self,
        observations: &[Observation],
    ) -> Result<OrbitalElements, ComputationError>;
}

#[async_trait]
impl<T> OrbitComputation for Arc<T>
where
    T: OrbitComputation + ?Sized,
{
    async fn compute(
        &self,
        observations: &[Observation],
    ) -> Result<OrbitalElements, ComputationError> {
        (**self).compute(observations).await
    }
}
