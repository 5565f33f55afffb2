use std::sync::RwLock;

use async_trait::async_trait;

use astro_core::{Comet, CometId};

use super::{CometRepository, RepositoryError, RepositoryResult};

/// In-memory comet repository.
///
/// Intended for tests/dev. Aggregates are kept whole, so a delete drops the
/// characteristic and observations together with the comet. Insertion order
/// is preserved for `get_all`.
#[derive(Debug, Default)]
pub struct InMemoryCometRepository {
    comets: RwLock<Vec<Comet>>,
}

impl InMemoryCometRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl CometRepository for InMemoryCometRepository {
    async fn create(&self, comet: &Comet) -> RepositoryResult<()> {
        comet.check_invariants()?;

        let mut comets = self.comets.write().map_err(|_| poisoned())?;
        if comets.iter().any(|c| c.id() == comet.id()) {
            return Err(RepositoryError::Storage(format!(
                "comet {} already exists",
                comet.id()
            )));
        }

        comets.push(comet.clone());
        Ok(())
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Comet>> {
        let comets = self.comets.read().map_err(|_| poisoned())?;
        Ok(comets.clone())
    }

    async fn get_by_id(&self, id: CometId) -> RepositoryResult<Comet> {
        let comets = self.comets.read().map_err(|_| poisoned())?;
        comets
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn delete(&self, id: CometId) -> RepositoryResult<()> {
        let mut comets = self.comets.write().map_err(|_| poisoned())?;
        let before = comets.len();
        comets.retain(|c| c.id() != id);

        if comets.len() == before {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astro_core::{CometSkeleton, ObservationInput, OrbitalElements, validate_observations};

    fn comet(observations: usize) -> Comet {
        let inputs = (0..observations)
            .map(|i| ObservationInput {
                right_ascension: format!("{i}h"),
                declination: format!("+{i}d"),
                date: format!("2024-05-{:02}T00:00:00", i + 1),
            })
            .collect();
        let batch = validate_observations(inputs).unwrap();
        CometSkeleton::assemble(batch, None).attach(OrbitalElements {
            semi_major_axis: 1.0,
            eccentricity: 0.5,
            inclination: 2.0,
            longitude_of_ascending_node: 3.0,
            argument_of_pericenter: 4.0,
            true_anomaly: 5.0,
            min_distance: None,
            min_approach_date: None,
        })
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let repo = InMemoryCometRepository::new();
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_fetch_by_id() {
        let repo = InMemoryCometRepository::new();
        let comet = comet(5);

        repo.create(&comet).await.unwrap();

        let loaded = repo.get_by_id(comet.id()).await.unwrap();
        assert_eq!(loaded, comet);
    }

    #[tokio::test]
    async fn get_all_keeps_insertion_order() {
        let repo = InMemoryCometRepository::new();
        let first = comet(5);
        let second = comet(7);

        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id(), first.id());
        assert_eq!(all[1].observations().len(), 7);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let repo = InMemoryCometRepository::new();
        let comet = comet(5);

        repo.create(&comet).await.unwrap();
        let err = repo.create(&comet).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Storage(_)));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_whole_aggregate() {
        let repo = InMemoryCometRepository::new();
        let comet = comet(5);
        repo.create(&comet).await.unwrap();

        repo.delete(comet.id()).await.unwrap();

        assert!(matches!(
            repo.get_by_id(comet.id()).await,
            Err(RepositoryError::NotFound(id)) if id == comet.id()
        ));
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let repo = InMemoryCometRepository::new();
        let id = CometId::new();

        assert!(matches!(
            repo.delete(id).await,
            Err(RepositoryError::NotFound(missing)) if missing == id
        ));
    }
}
