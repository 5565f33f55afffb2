//! Comet aggregate persistence boundary.
//!
//! The repository stores a comet, its orbital characteristic and its
//! observations as one unit. Implementations must keep the relational shape:
//!
//! - the characteristic is keyed by the comet id (one-to-one)
//! - observations reference the comet id (one-to-many)
//! - deleting a comet removes its observations **and** its characteristic
//!
//! `create` is all-or-nothing from the caller's point of view; `delete` is a
//! single operation keyed by id (no separate load step that could race).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use astro_core::{Comet, CometId, DomainError};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCometRepository;
pub use postgres::PostgresCometRepository;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository operation error.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("comet {0} not found")]
    NotFound(CometId),

    /// An aggregate (being written or read back) broke its invariants.
    #[error("comet aggregate is inconsistent: {0}")]
    Invariant(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        Self::Invariant(value.to_string())
    }
}

/// Persistence contract for comet aggregates.
#[async_trait]
pub trait CometRepository: Send + Sync {
    /// Persist the whole aggregate atomically.
    async fn create(&self, comet: &Comet) -> RepositoryResult<()>;

    /// Every stored aggregate, fully loaded. Empty when nothing is stored.
    async fn get_all(&self) -> RepositoryResult<Vec<Comet>>;

    /// One aggregate, fully loaded.
    async fn get_by_id(&self, id: CometId) -> RepositoryResult<Comet>;

    /// Remove the aggregate and everything it owns.
    async fn delete(&self, id: CometId) -> RepositoryResult<()>;
}

#[async_trait]
impl<T> CometRepository for Arc<T>
where
    T: CometRepository + ?Sized,
{
    async fn create(&self, comet: &Comet) -> RepositoryResult<()> {
        (**self).create(comet).await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Comet>> {
        (**self).get_all().await
    }

    async fn get_by_id(&self, id: CometId) -> RepositoryResult<Comet> {
        (**self).get_by_id(id).await
    }

    async fn delete(&self, id: CometId) -> RepositoryResult<()> {
        (**self).delete(id).await
    }
}
