use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{CometId, ObservationId};

/// Minimum number of observations a comet aggregate is built from.
pub const MIN_OBSERVATIONS: usize = 5;

/// A single astrometric measurement exactly as the caller supplied it.
///
/// Right ascension, declination and date are opaque strings: the core never
/// interprets them, it only carries them to the computation service and to
/// storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationInput {
    #[serde(rename = "directAscension")]
    pub right_ascension: String,
    #[serde(rename = "celestialDeclination")]
    pub declination: String,
    pub date: String,
}

/// A stored observation, linked to its owning comet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    #[serde(rename = "cometId")]
    pub comet_id: CometId,
    #[serde(rename = "directAscension")]
    pub right_ascension: String,
    #[serde(rename = "celestialDeclination")]
    pub declination: String,
    pub date: String,
}

impl Observation {
    /// The caller-supplied part of this observation.
    pub fn input(&self) -> ObservationInput {
        ObservationInput {
            right_ascension: self.right_ascension.clone(),
            declination: self.declination.clone(),
            date: self.date.clone(),
        }
    }
}

/// Orbital elements as produced by the external computation service.
///
/// Carries no identifier; it becomes an [`OrbitalCharacteristic`] once it is
/// attached to a comet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    #[serde(rename = "largeSemiAxis")]
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    #[serde(rename = "longitude")]
    pub longitude_of_ascending_node: f64,
    #[serde(rename = "pericenter")]
    pub argument_of_pericenter: f64,
    #[serde(rename = "trueAnomaly")]
    pub true_anomaly: f64,
    #[serde(rename = "minDistance", default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f64>,
    #[serde(
        rename = "minApproximationDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub min_approach_date: Option<String>,
}

/// Orbital characteristic of a comet: its elements keyed by the comet id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalCharacteristic {
    pub id: CometId,
    #[serde(flatten)]
    pub elements: OrbitalElements,
}

/// Aggregate root: a comet with its one characteristic and its observations.
///
/// Created once as a whole and never updated afterwards. Every constructor
/// upholds the linkage invariants, so a `Comet` value is always consistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comet {
    id: CometId,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "orbitalCharacteristic")]
    characteristic: OrbitalCharacteristic,
    observations: Vec<Observation>,
}

impl Comet {
    /// Rebuild an aggregate from stored parts, re-checking every invariant.
    pub fn from_parts(
        id: CometId,
        name: Option<String>,
        characteristic: OrbitalCharacteristic,
        observations: Vec<Observation>,
    ) -> DomainResult<Self> {
        let comet = Self {
            id,
            name,
            characteristic,
            observations,
        };
        comet.check_invariants()?;
        Ok(comet)
    }

    /// Built by the assembler, whose construction already guarantees linkage.
    pub(crate) fn assembled(
        id: CometId,
        name: Option<String>,
        characteristic: OrbitalCharacteristic,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            id,
            name,
            characteristic,
            observations,
        }
    }

    pub fn id(&self) -> CometId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn characteristic(&self) -> &OrbitalCharacteristic {
        &self.characteristic
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Verify the relational invariants of the aggregate.
    ///
    /// - the characteristic is keyed by the comet id
    /// - at least [`MIN_OBSERVATIONS`] observations, all pointing back at the comet
    /// - observation ids are unique
    pub fn check_invariants(&self) -> DomainResult<()> {
        if self.characteristic.id != self.id {
            return Err(DomainError::invariant(format!(
                "characteristic id {} does not match comet id {}",
                self.characteristic.id, self.id
            )));
        }

        if self.observations.len() < MIN_OBSERVATIONS {
            return Err(DomainError::invariant(format!(
                "comet {} has {} observations, at least {MIN_OBSERVATIONS} required",
                self.id,
                self.observations.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.observations.len());
        for observation in &self.observations {
            if observation.comet_id != self.id {
                return Err(DomainError::invariant(format!(
                    "observation {} references comet {}, expected {}",
                    observation.id, observation.comet_id, self.id
                )));
            }
            if !seen.insert(observation.id) {
                return Err(DomainError::invariant(format!(
                    "duplicate observation id {}",
                    observation.id
                )));
            }
        }

        Ok(())
    }
}
