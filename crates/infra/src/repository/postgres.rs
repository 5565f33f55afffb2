//! Postgres-backed comet repository.
//!
//! Schema lives in `migrations/0001_comets.sql` and is applied by
//! [`PostgresCometRepository::ensure_schema`]. Both dependants of a comet
//! reference it with `ON DELETE CASCADE`, so removing the comet row removes
//! the characteristic and the observations in the same statement.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Storage` (duplicate id) |
//! | Database (foreign key violation) | `23503` | `Storage` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed | N/A | `Storage` |
//! | Other | N/A | `Storage` |
//!
//! Rows that decode but do not form a valid aggregate (missing characteristic,
//! too few observations) surface as `RepositoryError::Invariant`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use astro_core::{Comet, CometId, Observation, ObservationId, OrbitalCharacteristic, OrbitalElements};

use super::{CometRepository, RepositoryError, RepositoryResult};

const SCHEMA: &str = include_str!("../../migrations/0001_comets.sql");

/// Postgres-backed comet repository.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the repository can be
/// shared across request tasks.
#[derive(Debug, Clone)]
pub struct PostgresCometRepository {
    pool: Arc<PgPool>,
}

impl PostgresCometRepository {
    /// Create a repository over an already connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Apply the canonical schema. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn load_observations(
        &self,
        comet_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, Vec<Observation>>> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                comet_id,
                right_ascension,
                declination,
                observed_at
            FROM observations
            WHERE comet_id = ANY($1)
            ORDER BY comet_id, position ASC
            "#,
        )
        .bind(comet_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_observations", e))?;

        let mut grouped: HashMap<Uuid, Vec<Observation>> = HashMap::new();
        for row in rows {
            let row = ObservationRow::from_row(&row).map_err(|e| {
                RepositoryError::Storage(format!("failed to deserialize observation row: {e}"))
            })?;
            grouped.entry(row.comet_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

#[async_trait]
impl CometRepository for PostgresCometRepository {
    #[instrument(
        skip(self, comet),
        fields(
            comet_id = %comet.id(),
            observation_count = comet.observations().len()
        ),
        err
    )]
    async fn create(&self, comet: &Comet) -> RepositoryResult<()> {
        comet.check_invariants()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("INSERT INTO comets (id, name) VALUES ($1, $2)")
            .bind(comet.id().as_uuid())
            .bind(comet.name())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_comet", e))?;

        let characteristic = comet.characteristic();
        let elements = &characteristic.elements;
        sqlx::query(
            r#"
            INSERT INTO orbital_characteristics (
                id,
                semi_major_axis,
                eccentricity,
                inclination,
                longitude_ascending_node,
                argument_of_pericenter,
                true_anomaly,
                min_distance,
                min_approach_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(characteristic.id.as_uuid())
        .bind(elements.semi_major_axis)
        .bind(elements.eccentricity)
        .bind(elements.inclination)
        .bind(elements.longitude_of_ascending_node)
        .bind(elements.argument_of_pericenter)
        .bind(elements.true_anomaly)
        .bind(elements.min_distance)
        .bind(elements.min_approach_date.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_characteristic", e))?;

        for (position, observation) in comet.observations().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO observations (
                    id,
                    comet_id,
                    position,
                    right_ascension,
                    declination,
                    observed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(observation.id.as_uuid())
            .bind(observation.comet_id.as_uuid())
            .bind(position as i32)
            .bind(&observation.right_ascension)
            .bind(&observation.declination)
            .bind(&observation.date)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_observation", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(comet_count), err)]
    async fn get_all(&self) -> RepositoryResult<Vec<Comet>> {
        let rows = sqlx::query(&format!("{HEAD_SELECT} ORDER BY c.created_at ASC, c.id ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_comets", e))?;

        let heads = rows
            .iter()
            .map(|row| CometHeadRow::from_row(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Storage(format!("failed to deserialize comet row: {e}")))?;

        if heads.is_empty() {
            return Ok(Vec::new());
        }

        // One batch query for the observations of every comet.
        let ids: Vec<Uuid> = heads.iter().map(|h| h.id).collect();
        let mut observations = self.load_observations(&ids).await?;

        let mut comets = Vec::with_capacity(heads.len());
        for head in heads {
            let owned = observations.remove(&head.id).unwrap_or_default();
            comets.push(head.into_comet(owned)?);
        }

        Span::current().record("comet_count", comets.len());
        Ok(comets)
    }

    #[instrument(skip(self), fields(comet_id = %id), err)]
    async fn get_by_id(&self, id: CometId) -> RepositoryResult<Comet> {
        let row = sqlx::query(&format!("{HEAD_SELECT} WHERE c.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_comet", e))?
            .ok_or(RepositoryError::NotFound(id))?;

        let head = CometHeadRow::from_row(&row)
            .map_err(|e| RepositoryError::Storage(format!("failed to deserialize comet row: {e}")))?;

        let mut observations = self.load_observations(&[head.id]).await?;
        let owned = observations.remove(&head.id).unwrap_or_default();
        head.into_comet(owned)
    }

    #[instrument(skip(self), fields(comet_id = %id), err)]
    async fn delete(&self, id: CometId) -> RepositoryResult<()> {
        // Single statement: the cascade removes characteristic and observations.
        let result = sqlx::query("DELETE FROM comets WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comet", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

const HEAD_SELECT: &str = r#"
    SELECT
        c.id,
        c.name,
        oc.id AS characteristic_id,
        oc.semi_major_axis,
        oc.eccentricity,
        oc.inclination,
        oc.longitude_ascending_node,
        oc.argument_of_pericenter,
        oc.true_anomaly,
        oc.min_distance,
        oc.min_approach_date
    FROM comets c
    LEFT JOIN orbital_characteristics oc ON oc.id = c.id
"#;

/// Comet row joined with its (optional, if the data is broken) characteristic.
struct CometHeadRow {
    id: Uuid,
    name: Option<String>,
    characteristic: Option<OrbitalElements>,
}

impl<'r> FromRow<'r, PgRow> for CometHeadRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let characteristic_id: Option<Uuid> = row.try_get("characteristic_id")?;
        let characteristic = match characteristic_id {
            Some(_) => Some(OrbitalElements {
                semi_major_axis: row.try_get("semi_major_axis")?,
                eccentricity: row.try_get("eccentricity")?,
                inclination: row.try_get("inclination")?,
                longitude_of_ascending_node: row.try_get("longitude_ascending_node")?,
                argument_of_pericenter: row.try_get("argument_of_pericenter")?,
                true_anomaly: row.try_get("true_anomaly")?,
                min_distance: row.try_get("min_distance")?,
                min_approach_date: row.try_get("min_approach_date")?,
            }),
            None => None,
        };

        Ok(CometHeadRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            characteristic,
        })
    }
}

impl CometHeadRow {
    fn into_comet(self, observations: Vec<Observation>) -> RepositoryResult<Comet> {
        let id = CometId::from_uuid(self.id);
        let elements = self.characteristic.ok_or_else(|| {
            RepositoryError::Invariant(format!("comet {id} has no orbital characteristic"))
        })?;

        let comet = Comet::from_parts(
            id,
            self.name,
            OrbitalCharacteristic { id, elements },
            observations,
        )?;
        Ok(comet)
    }
}

struct ObservationRow {
    id: Uuid,
    comet_id: Uuid,
    right_ascension: String,
    declination: String,
    observed_at: String,
}

impl<'r> FromRow<'r, PgRow> for ObservationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ObservationRow {
            id: row.try_get("id")?,
            comet_id: row.try_get("comet_id")?,
            right_ascension: row.try_get("right_ascension")?,
            declination: row.try_get("declination")?,
            observed_at: row.try_get("observed_at")?,
        })
    }
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            id: ObservationId::from_uuid(row.id),
            comet_id: CometId::from_uuid(row.comet_id),
            right_ascension: row.right_ascension,
            declination: row.declination,
            date: row.observed_at,
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Storage(format!("duplicate key: {msg}")),
                Some("23503") => RepositoryError::Storage(format!("foreign key violation: {msg}")),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}
