//! Submission validation and aggregate assembly.
//!
//! A creation request moves through distinct types so each stage can only be
//! reached from the one before it:
//!
//! ```text
//! CometSubmission --validate--> ValidatedObservations --assemble--> CometSkeleton --attach--> Comet
//! ```
//!
//! Nothing here performs IO; identifiers are generated locally.

use crate::comet::{
    Comet, MIN_OBSERVATIONS, Observation, ObservationInput, OrbitalCharacteristic, OrbitalElements,
};
use crate::error::{DomainError, DomainResult};
use crate::id::{CometId, ObservationId};

/// Raw creation request: observations plus an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CometSubmission {
    pub observations: Vec<ObservationInput>,
    pub name: Option<String>,
}

/// Observation batch that passed the minimum-size check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedObservations {
    observations: Vec<ObservationInput>,
}

impl ValidatedObservations {
    pub fn as_slice(&self) -> &[ObservationInput] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Check that a batch holds at least [`MIN_OBSERVATIONS`] entries and that
/// every field is storable text.
pub fn validate_observations(
    observations: Vec<ObservationInput>,
) -> DomainResult<ValidatedObservations> {
    if observations.len() < MIN_OBSERVATIONS {
        return Err(DomainError::validation(format!(
            "Count observations must be > {}",
            MIN_OBSERVATIONS - 1
        )));
    }

    for (index, observation) in observations.iter().enumerate() {
        let fields = [
            ("directAscension", &observation.right_ascension),
            ("celestialDeclination", &observation.declination),
            ("date", &observation.date),
        ];
        for (field, value) in fields {
            if value.contains('\0') {
                return Err(DomainError::validation(format!(
                    "observation {index}: {field} must not contain NUL characters"
                )));
            }
        }
    }

    Ok(ValidatedObservations { observations })
}

/// Trim the optional display name; blank becomes absent.
pub fn validate_name(name: Option<String>) -> DomainResult<Option<String>> {
    let name = normalize_name(name);
    if name.as_deref().is_some_and(|n| n.contains('\0')) {
        return Err(DomainError::validation("name must not contain NUL characters"));
    }
    Ok(name)
}

/// A comet with identifiers assigned but no characteristic yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CometSkeleton {
    id: CometId,
    name: Option<String>,
    observations: Vec<Observation>,
}

impl CometSkeleton {
    /// Assign a fresh comet id, a fresh id per observation, and point every
    /// observation back at the comet.
    pub fn assemble(batch: ValidatedObservations, name: Option<String>) -> Self {
        let id = CometId::new();
        let observations = batch
            .observations
            .into_iter()
            .map(|input| Observation {
                id: ObservationId::new(),
                comet_id: id,
                right_ascension: input.right_ascension,
                declination: input.declination,
                date: input.date,
            })
            .collect();

        Self {
            id,
            name: normalize_name(name),
            observations,
        }
    }

    pub fn id(&self) -> CometId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Key the computed elements by the comet id and complete the aggregate.
    pub fn attach(self, elements: OrbitalElements) -> Comet {
        let characteristic = OrbitalCharacteristic {
            id: self.id,
            elements,
        };
        Comet::assembled(self.id, self.name, characteristic, self.observations)
    }
}

fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(i: usize) -> ObservationInput {
        ObservationInput {
            right_ascension: format!("{i}.0"),
            declination: format!("{i}.5"),
            date: format!("2024-03-{:02}T12:00:00", i + 1),
        }
    }

    fn elements() -> OrbitalElements {
        OrbitalElements {
            semi_major_axis: 17.8,
            eccentricity: 0.967,
            inclination: 162.3,
            longitude_of_ascending_node: 58.4,
            argument_of_pericenter: 111.3,
            true_anomaly: 38.4,
            min_distance: None,
            min_approach_date: None,
        }
    }

    #[test]
    fn four_observations_are_rejected() {
        let err = validate_observations((0..4).map(input).collect()).unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("Count observations must be > 4".to_string())
        );
    }

    #[test]
    fn five_observations_are_accepted() {
        let batch = validate_observations((0..5).map(input).collect()).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.as_slice()[4], input(4));
    }

    #[test]
    fn blank_names_are_dropped_and_others_trimmed() {
        let batch = validate_observations((0..5).map(input).collect()).unwrap();
        assert_eq!(CometSkeleton::assemble(batch.clone(), Some("   ".into())).name(), None);
        assert_eq!(
            CometSkeleton::assemble(batch, Some("  Halley ".into())).name(),
            Some("Halley")
        );
    }

    #[test]
    fn attach_keys_characteristic_by_comet_id() {
        let batch = validate_observations((0..6).map(input).collect()).unwrap();
        let skeleton = CometSkeleton::assemble(batch, None);
        let id = skeleton.id();

        let comet = skeleton.attach(elements());
        assert_eq!(comet.id(), id);
        assert_eq!(comet.characteristic().id, id);
        assert_eq!(comet.characteristic().elements, elements());
        assert!(comet.check_invariants().is_ok());
    }

    #[test]
    fn nul_in_any_observation_field_is_rejected() {
        for field in 0..3 {
            let mut inputs: Vec<ObservationInput> = (0..5).map(input).collect();
            let target = match field {
                0 => &mut inputs[2].right_ascension,
                1 => &mut inputs[2].declination,
                _ => &mut inputs[2].date,
            };
            target.insert(1, '\0');

            let err = validate_observations(inputs).unwrap_err();
            match err {
                DomainError::Validation(msg) => {
                    assert!(msg.starts_with("observation 2:"), "{msg}");
                    assert!(msg.contains("NUL"), "{msg}");
                }
                other => panic!("expected Validation, got {other:?}"),
            }
        }
    }

    #[test]
    fn names_are_trimmed_and_nul_rejected() {
        assert_eq!(validate_name(None).unwrap(), None);
        assert_eq!(validate_name(Some("  ".into())).unwrap(), None);
        assert_eq!(
            validate_name(Some(" 67P/Churyumov ".into())).unwrap(),
            Some("67P/Churyumov".to_string())
        );
        assert!(matches!(
            validate_name(Some("67P\0".into())),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: batches below the minimum never validate.
        #[test]
        fn short_batches_never_validate(count in 0usize..MIN_OBSERVATIONS) {
            let result = validate_observations((0..count).map(input).collect());
            prop_assert!(matches!(result, Err(DomainError::Validation(_))));
        }

        /// Property: every assembled aggregate is fully linked to its comet id
        /// and carries the caller's strings unchanged.
        #[test]
        fn assembled_aggregates_are_linked(
            raw in prop::collection::vec(("[0-9]{1,3}\\.[0-9]{1,4}", "-?[0-9]{1,2}\\.[0-9]{1,4}", "[0-9T:-]{10,19}"), MIN_OBSERVATIONS..40)
        ) {
            let inputs: Vec<ObservationInput> = raw
                .into_iter()
                .map(|(ra, dec, date)| ObservationInput { right_ascension: ra, declination: dec, date })
                .collect();

            let batch = validate_observations(inputs.clone()).unwrap();
            let comet = CometSkeleton::assemble(batch, None).attach(elements());

            prop_assert_eq!(comet.characteristic().id, comet.id());
            prop_assert_eq!(comet.observations().len(), inputs.len());
            for (observation, input) in comet.observations().iter().zip(&inputs) {
                prop_assert_eq!(observation.comet_id, comet.id());
                prop_assert_eq!(&observation.input(), input);
            }
            prop_assert!(comet.check_invariants().is_ok());
        }
    }
}
