//! `astro-core` — comet aggregate model and its construction rules.
//!
//! This crate contains **pure domain** code (no IO, no HTTP, no storage).

pub mod assembly;
pub mod comet;
pub mod error;
pub mod id;

pub use assembly::{
    CometSkeleton, CometSubmission, ValidatedObservations, validate_name, validate_observations,
};
pub use comet::{
    Comet, MIN_OBSERVATIONS, Observation, ObservationInput, OrbitalCharacteristic, OrbitalElements,
};
pub use error::{DomainError, DomainResult};
pub use id::{CometId, ObservationId};
